mod desktop;
mod profile;

pub use desktop::render_desktop_entry;
pub use profile::{
    PackageProfile, ARCHIVE_NAME, DISPLAY_NAME, EXEC_PATH, PACKAGE_NAME, RELEASE_URL,
};
