// src/cli/preview.rs
use super::{CliError, EditArgs};
use devicebatch::devices::{parse_device_input, render_pipe, resolve};

pub fn run(reference: &str, edit: &EditArgs) -> Result<(), CliError> {
    let reference = parse_device_input(reference)?;
    let intent = edit.to_intent()?;

    println!("Current: {}", render_pipe(reference.as_slice()));
    println!("Edit:    {}", intent.describe());

    let resolved = resolve(&reference, &intent)?;
    println!("Result:  {}", render_pipe(resolved.final_order.as_slice()));
    if !resolved.added.is_empty() {
        println!("  added:   {}", render_pipe(&resolved.added));
    }
    if !resolved.removed.is_empty() {
        println!("  removed: {}", render_pipe(&resolved.removed));
    }
    Ok(())
}
