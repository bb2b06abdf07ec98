//! Shared application plumbing for the Restless Life terminal surfaces.

pub mod terminal;

pub mod renderer {
    use anyhow::Result;
    use restless_core::LifeWorld;

    pub trait Renderer {
        /// Stable identifier describing the renderer implementation (e.g., "terminal").
        fn name(&self) -> &'static str;

        /// Launch the renderer; blocks until the rendering session completes.
        fn run(&self, world: LifeWorld) -> Result<()>;
    }
}

pub use terminal::TerminalRenderer;
