pub mod compositor;
pub mod gaussian;

pub use compositor::BlurCompositor;
