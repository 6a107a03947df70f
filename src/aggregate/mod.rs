pub mod facet;
pub mod monoid;
