pub mod user;
pub mod server_listing;
pub mod guild_settings;
pub mod server_join;
pub mod support_ticket;
pub mod server_template;
pub mod template_process;
pub mod reaction_role;
