pub mod editor;
pub mod object;
