mod click;
mod site;

pub use click::{Click, ClickView, NewClick};
pub use site::{CreateSiteRequest, Site};
