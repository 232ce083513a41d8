pub mod diagnosis;
pub mod family;
pub mod tobacco;
