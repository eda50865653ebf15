//! Render command: print the manifest for this run without applying it

use crate::commands::deploy::{preflight, substituter};
use crate::core::context::RunContext;
use crate::core::error::DeployResult;
use crate::release::render;

/// Run the render command
pub fn run_render(ctx: &RunContext) -> DeployResult<()> {
  let env = preflight(ctx)?;
  let descriptor = ctx.descriptor()?;

  let template = render::load_template(&ctx.template())?;
  let substituter = substituter(ctx.config.deploy.renderer);
  let rendered = render::render_text(&template, &descriptor, &env, substituter.as_ref())?;

  tracing::debug!(image = %descriptor.image(), "rendered manifest");
  print!("{}", rendered);
  Ok(())
}
