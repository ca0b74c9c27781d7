use crate::models::{
    Announcement, Assignment, Course, CourseWithGrade, DashboardData, Enrollment, Resource, User,
};

/// Folds a user's enrollments into the denormalized dashboard view.
///
/// Courses come out in enrollment order, each carrying the enrollment's
/// grade and every assignment of that course. `tasks` collects those same
/// assignments minus the completed ones. Enrollments that point at an
/// unknown course are skipped.
pub fn compose(
    user: User,
    enrollments: &[Enrollment],
    courses: &[Course],
    assignments: &[Assignment],
    announcements: Vec<Announcement>,
    resources: Vec<Resource>,
) -> DashboardData {
    let mut course_list = Vec::new();
    let mut tasks = Vec::new();

    for enrollment in enrollments.iter().filter(|e| e.user_id == user.id) {
        let course = match courses.iter().find(|c| c.id == enrollment.course_id) {
            Some(course) => course,
            None => continue,
        };

        let course_assignments: Vec<Assignment> = assignments
            .iter()
            .filter(|a| a.course_id == course.id)
            .cloned()
            .collect();

        tasks.extend(
            course_assignments
                .iter()
                .filter(|a| !a.status.is_completed())
                .cloned(),
        );

        course_list.push(CourseWithGrade {
            course: course.clone(),
            grade: enrollment
                .current_grade
                .clone()
                .filter(|grade| !grade.is_empty()),
            assignments: course_assignments,
        });
    }

    DashboardData {
        user,
        courses: course_list,
        announcements,
        resources,
        tasks,
    }
}
