pub(crate) mod blueprints;
pub(crate) mod health;
pub(crate) mod question_types;
pub(crate) mod questions;
pub(crate) mod responses;
pub(crate) mod sessions;
pub(crate) mod test_items;
