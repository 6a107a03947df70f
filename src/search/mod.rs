pub mod fuzzy;
pub mod phrase;
pub mod prefix;
pub mod results;
