pub mod change_check;
pub mod dataset;
pub mod server;
pub mod theme;

pub use change_check::Entity as ChangeCheckEntity;
pub use dataset::Entity as DatasetEntity;
pub use server::Entity as ServerEntity;
pub use theme::Entity as ThemeEntity;
