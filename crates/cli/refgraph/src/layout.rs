//! Layout command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use rg_notation::{FieldLayout, TypeTable};
use rg_ops::Program;
use rg_span::FileId;
use std::path::Path;

/// Prints the inner tag layout of every composite in the program at `path`.
pub fn layout(path: &Path) -> Result<()> {
    let program = Program::from_file(path)
        .with_context(|| format!("failed to load program {}", path.display()))?;
    let (table, errors) = TypeTable::build(&program.composites, FileId::default());

    for layout in table.layouts() {
        println!("{} {}", "composite".bold(), layout.name);
        for (index, (name, shape)) in layout.tags.iter().enumerate() {
            match shape.second_order {
                Some(second) => println!("  tag {index} `{name}`: {} -> {second}", shape.mutability),
                None => println!("  tag {index} `{name}`: {}", shape.mutability),
            }
        }
        for field in &layout.fields {
            match &field.layout {
                FieldLayout::Value { inner_tags } => {
                    println!("  field {}: {} tags {inner_tags:?}", field.name, field.ty);
                }
                FieldLayout::Reference { mutability, tag } => {
                    println!("  field {}: &{mutability} {} tag {tag}", field.name, field.ty);
                }
            }
        }
    }

    for error in &errors {
        eprintln!("{} {error}", "error:".red().bold());
    }
    if !errors.is_empty() {
        anyhow::bail!("{} notation errors found", errors.len());
    }
    Ok(())
}
