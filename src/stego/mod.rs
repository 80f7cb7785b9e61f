pub mod dct;
pub mod frame;
pub mod gif;
pub mod lsb;
pub mod text;
