mod csrf_token;
mod health_check;
mod link_preview;
mod posts;
mod render;
mod uploads;

pub use csrf_token::csrf_token;
pub use health_check::health_check;
pub use link_preview::link_preview;
pub use posts::create_post;
pub use render::render;
pub use uploads::serve_upload;
