use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{Announcement, AnnouncementsPage, DaySchedule, Lesson, ScheduleOption, Subgroup};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::get_group_schedule,
        crate::handlers::get_teacher_schedule,
        crate::handlers::get_group_options,
        crate::handlers::get_teacher_options,
        crate::handlers::get_announcements
    ),
    components(schemas(
        Lesson,
        Subgroup,
        DaySchedule,
        ScheduleOption,
        Announcement,
        AnnouncementsPage
    )),
    tags(
        (name = "schedule", description = "Group and teacher schedules from hmtpk.ru"),
        (name = "announcements", description = "Press-center announcements from hmtpk.ru")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
