pub mod canvas;
pub mod relay;
