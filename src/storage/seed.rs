use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::models::{
    AssignmentStatus, NewAnnouncement, NewAssignment, NewCourse, NewEnrollment, NewResource,
    NewUser, Priority,
};
use crate::storage::{Storage, StoreResult};

const TERM: &str = "Spring 2026";

/// Loads the demo data set through the regular create operations, so ids are
/// assigned the same way as for any other insert.
pub async fn seed<S: Storage + ?Sized>(storage: &S) -> StoreResult<bool> {
    if storage.count_users().await? > 0 {
        log::debug!("Users already present, skipping seed");
        return Ok(false);
    }

    let andy = storage
        .create_user(NewUser {
            external_id: "andy".to_string(),
            name: "Andy Tercero Vargas".to_string(),
            email: "andy@asu.edu".to_string(),
            affiliations: vec!["Student".to_string(), "Staff".to_string()],
        })
        .await?;

    let cse445 = storage
        .create_course(course(
            "CSE 445",
            "Distributed Software Development",
            "Dr. Chen",
            "BYENG 210",
            "MWF 10:30 AM - 11:20 AM",
            "maroon",
        ))
        .await?;
    let cse463 = storage
        .create_course(course(
            "CSE 463",
            "Introduction to Human-Computer Interaction",
            "Dr. Walker",
            "CAVC 101",
            "TTh 1:30 PM - 2:45 PM",
            "gold",
        ))
        .await?;
    let mat267 = storage
        .create_course(course(
            "MAT 267",
            "Calculus for Engineers III",
            "Dr. Smith",
            "PSF 173",
            "MWF 9:00 AM - 9:50 AM",
            "maroon",
        ))
        .await?;

    for (course_id, grade) in [(cse445.id, "92%"), (cse463.id, "88%"), (mat267.id, "76%")] {
        storage
            .create_enrollment(NewEnrollment {
                user_id: andy.id,
                course_id,
                role: None,
                current_grade: Some(grade.to_string()),
            })
            .await?;
    }

    let assignments = [
        (cse445.id, "Project 3: SOA Services", due(2026, 3, 15), AssignmentStatus::Pending, None, "100"),
        (cse445.id, "Quiz 4", due(2026, 3, 10), AssignmentStatus::Pending, None, "20"),
        (cse463.id, "Heuristic Evaluation", due(2026, 3, 12), AssignmentStatus::Pending, None, "50"),
        (mat267.id, "WebWork Set 8", due(2026, 3, 8), AssignmentStatus::Completed, Some("10/10"), "10"),
    ];
    for (course_id, title, due_date, status, score, max_score) in assignments {
        storage
            .create_assignment(NewAssignment {
                course_id,
                title: title.to_string(),
                due_date,
                status,
                score: score.map(str::to_string),
                max_score: Some(max_score.to_string()),
            })
            .await?;
    }

    let announcements = [
        (
            "Graduation Application Deadline",
            "The deadline to apply for Spring 2026 graduation is March 30th.",
            "University Registrar",
            Priority::High,
        ),
        (
            "Career Fair Next Week",
            "Join us at the Memorial Union for the Spring Career Fair.",
            "Career Services",
            Priority::Normal,
        ),
        (
            "System Maintenance",
            "MyASU will be down for maintenance on Sunday from 2AM to 4AM.",
            "UTO",
            Priority::Alert,
        ),
    ];
    for (title, content, source, priority) in announcements {
        storage
            .create_announcement(NewAnnouncement {
                title: title.to_string(),
                content: content.to_string(),
                source: source.to_string(),
                date: None,
                priority,
            })
            .await?;
    }

    let resources = [
        ("Gmail", "Tools", "Mail"),
        ("Canvas", "Tools", "BookOpen"),
        ("Drive", "Tools", "HardDrive"),
        ("Finances", "Info", "DollarSign"),
        ("Health & Wellness", "Info", "Heart"),
    ];
    for (title, category, icon) in resources {
        storage
            .create_resource(NewResource {
                title: title.to_string(),
                url: "#".to_string(),
                category: category.to_string(),
                icon: Some(icon.to_string()),
            })
            .await?;
    }

    log::info!("Seeded demo data for user `{}`", andy.external_id);
    Ok(true)
}

fn course(
    code: &str,
    title: &str,
    instructor: &str,
    location: &str,
    schedule: &str,
    color: &str,
) -> NewCourse {
    NewCourse {
        code: code.to_string(),
        title: title.to_string(),
        term: TERM.to_string(),
        instructor: instructor.to_string(),
        location: Some(location.to_string()),
        schedule: Some(schedule.to_string()),
        credits: None,
        color: Some(color.to_string()),
    }
}

fn due(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
