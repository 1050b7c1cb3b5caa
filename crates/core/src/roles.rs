//! Well-known roles and the permission templates routes are guarded by.
//!
//! Role names must match the seed data in `20260301000002_create_roles.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

// Users (administration)
pub const PERM_USERS_VIEW: &str = "ui.admin.users.view";
pub const PERM_USERS_CREATE: &str = "ui.admin.users.create";
pub const PERM_USERS_UPDATE: &str = "ui.admin.users.update";
pub const PERM_USERS_DELETE: &str = "ui.admin.users.delete";

// Projects
pub const PERM_PROJECTS_VIEW: &str = "ui.projects.view";
pub const PERM_PROJECTS_CREATE: &str = "ui.projects.create";
pub const PERM_PROJECT_VIEW: &str = "ui.projects.{project_id}.view";
pub const PERM_PROJECT_UPDATE: &str = "ui.projects.{project_id}.update";
pub const PERM_PROJECT_DELETE: &str = "ui.projects.{project_id}.delete";
pub const PERM_PROJECT_CHAT: &str = "ui.projects.{project_id}.chat";

// Templates
pub const PERM_TEMPLATES_VIEW: &str = "ui.templates.view";
pub const PERM_TEMPLATES_CREATE: &str = "ui.templates.create";
pub const PERM_TEMPLATES_IMPORT: &str = "ui.templates.import";
pub const PERM_TEMPLATE_VIEW: &str = "ui.templates.{template_id}.view";
pub const PERM_TEMPLATE_UPDATE: &str = "ui.templates.{template_id}.update";
pub const PERM_TEMPLATE_DELETE: &str = "ui.templates.{template_id}.delete";

// Queue
pub const PERM_QUEUE_VIEW: &str = "ui.admin.queue.view";

/// Every template above, for startup validation.
pub const ALL_PERMISSION_TEMPLATES: &[&str] = &[
    PERM_USERS_VIEW,
    PERM_USERS_CREATE,
    PERM_USERS_UPDATE,
    PERM_USERS_DELETE,
    PERM_PROJECTS_VIEW,
    PERM_PROJECTS_CREATE,
    PERM_PROJECT_VIEW,
    PERM_PROJECT_UPDATE,
    PERM_PROJECT_DELETE,
    PERM_PROJECT_CHAT,
    PERM_TEMPLATES_VIEW,
    PERM_TEMPLATES_CREATE,
    PERM_TEMPLATES_IMPORT,
    PERM_TEMPLATE_VIEW,
    PERM_TEMPLATE_UPDATE,
    PERM_TEMPLATE_DELETE,
    PERM_QUEUE_VIEW,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionTemplate;

    #[test]
    fn all_templates_parse() {
        for t in ALL_PERMISSION_TEMPLATES {
            assert!(PermissionTemplate::parse(t).is_ok(), "{t} must parse");
        }
    }
}
