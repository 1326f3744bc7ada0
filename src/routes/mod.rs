/// Router Module Index
///
/// Routes are grouped by who may reach them. Access control for a group is
/// applied as layers in `create_router`.

/// Routes open to every visitor. Commenting checks for a login inside its handler.
pub mod public;

/// Post management, reachable only by the administrator.
pub mod admin;
