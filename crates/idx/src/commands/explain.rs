//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., A001, B002)
    pub code: String,
}

struct ErrorExplanation {
    code: &'static str,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const ERROR_EXPLANATIONS: &[ErrorExplanation] = &[
    // Parse errors
    ErrorExplanation {
        code: "P001",
        title: "Parse Error",
        description: "The parser encountered invalid syntax. The file is not rewritten.",
        example: Some("let x = ;  // Missing value"),
        suggestion: Some("Fix the syntax error. TypeScript files need a .ts/.tsx extension to be parsed as TypeScript."),
        related: &[],
    },
    // Call sites
    ErrorExplanation {
        code: "A001",
        title: "Wrong Number of Arguments",
        description: "The `idx` function takes exactly two arguments: the object to start from and an arrow function describing the path.",
        example: Some("idx(props);  // Missing the accessor"),
        suggestion: Some("idx(props, _ => _.user.name)"),
        related: &["S001"],
    },
    ErrorExplanation {
        code: "S001",
        title: "Invalid Accessor",
        description: r#"The second argument must be an arrow function with a single identifier
parameter and an expression body made only of property accesses (and, unless
strict chains are enabled, calls) starting from that parameter."#,
        example: Some(r#"idx(a, _ => { return _.b; })  // Block body
idx(a, (x, y) => x.b)          // Two parameters
idx(a, _ => other.b)           // Does not start from the parameter
idx(a, _ => _.b + 1)           // Not a property access"#),
        suggestion: Some("idx(a, _ => _.b.c[0].d())"),
        related: &["A001"],
    },
    // Bindings
    ErrorExplanation {
        code: "B001",
        title: "Invalid Helper Import",
        description: "The helper must be imported as a single default value import. Named, namespace, side-effect and type-only imports of the helper module are rejected.",
        example: Some(r#"import { idx } from 'idx';
import type idx from 'idx';
import 'idx';"#),
        suggestion: Some("import idx from 'idx';"),
        related: &["B002"],
    },
    ErrorExplanation {
        code: "B002",
        title: "Helper Redefined",
        description: "A helper binding is assigned to or declared again after it was imported or required. Every call would have to be rewritten against a value that is not the helper.",
        example: Some(r#"const idx = require('idx');
idx = other;  // Redefinition"#),
        suggestion: Some("Use a different name for the other value."),
        related: &["B001"],
    },
    // Retained code
    ErrorExplanation {
        code: "W001",
        title: "Helper Used Other Than as a Call",
        description: r#"The helper is referenced somewhere other than as the callee of a call,
for example passed as a value or exported. Calls are still rewritten, but the
import or require has to stay so that reference keeps working."#,
        example: Some("export default idx;"),
        suggestion: Some("Call the helper directly if the import should be removed."),
        related: &["W002"],
    },
    ErrorExplanation {
        code: "W002",
        title: "Unrecognized Require",
        description: "The helper module is required into something other than a plain identifier, so calls through it are not rewritten.",
        example: Some("const { default: idx } = require('idx');"),
        suggestion: Some("const idx = require('idx');"),
        related: &["W001"],
    },
    // I/O
    ErrorExplanation {
        code: "I002",
        title: "I/O Error",
        description: "A source file could not be read or an output file could not be written.",
        example: None,
        suggestion: Some("Check that the path exists and is readable (or writable)."),
        related: &[],
    },
];

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let code = args.code.to_uppercase();

    let explanation = ERROR_EXPLANATIONS
        .iter()
        .find(|e| e.code == code)
        .ok_or_else(|| anyhow!("Unknown error code: {}", code))?;

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(&code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            } else {
                println!(
                    "\n{}: {}\n{}",
                    code,
                    explanation.title,
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            }

            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                for line in suggestion.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": explanation.code,
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
