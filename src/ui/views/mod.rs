mod list_page;
mod pages;
mod registration;

pub use list_page::ListPageView;
pub use registration::RegistrationView;
