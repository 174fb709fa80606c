mod build;
mod clean;
mod dir;
mod info;
mod program;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use dir::cmd_dir;
pub use info::cmd_info;
pub use program::{cmd_fuses, cmd_install, cmd_upload};
