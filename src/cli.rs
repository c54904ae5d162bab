//! Minimal CLI: descriptors → (plan | rust)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;

use crate::codegen::Codegen;
use crate::config::{Derivation, EngineConfig};
use crate::descriptor::Registry;
use crate::lower::{PlanSet, lower_with_dependencies};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// derive equality, ordering, traversal, hashing and rendering for indexed algebraic data types
#[derive(Parser, Debug)]
#[command(name = "gderive", version)]
pub struct CommandLineInterface {
    /// log derivation progress to stderr (`GDERIVE_LOG` takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the derivation plans as JSON
    Plan(PlanOut),
    /// emit Rust source for the selected derivations
    Rust(RustOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more descriptor documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// type to derive; repeatable (every algebraic type in the inputs if omitted)
    #[arg(long = "type", short = 't')]
    types: Vec<String>,

    /// JSON engine configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct PlanOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct RustOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// derivations to emit, comma separated (overrides the configuration)
    #[arg(long, value_enum, value_delimiter = ',')]
    derive: Vec<Derivation>,

    /// leave out the support items; they must already be in scope
    #[arg(long)]
    no_prelude: bool,

    /// output .rs file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_registry(&self) -> Result<Registry> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let registry = Registry::load_paths(source_paths)?;
        tracing::info!(definitions = registry.len(), "loaded descriptors");
        Ok(registry)
    }

    fn load_config(&self) -> Result<EngineConfig> {
        match self.config.as_ref() {
            Some(path) => EngineConfig::load(path),
            None => Ok(EngineConfig::default()),
        }
    }

    /// Plans for the requested types and everything they mention, in request
    /// order. Each requested type is derived independently.
    fn derive_plans(&self, config: &EngineConfig) -> Result<PlanSet> {
        let registry = self.load_registry()?;
        let roots = if self.types.is_empty() { registry.algebraic_names() } else { self.types.clone() };
        if roots.is_empty() {
            bail!("no algebraic types found in the inputs");
        }
        let per_root = roots
            .par_iter()
            .map(|root| {
                lower_with_dependencies(&registry, std::slice::from_ref(root), config)
                    .with_context(|| format!("failed to derive `{root}`"))
            })
            .collect::<Result<Vec<PlanSet>>>()?;
        let mut plans = PlanSet::new();
        for set in per_root {
            for (name, plan) in set {
                plans.entry(name).or_insert(plan);
            }
        }
        tracing::info!(requested = roots.len(), derived = plans.len(), "derivation plans ready");
        Ok(plans)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool { self.verbose }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Plan(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let config = target.input_settings.load_config()?;
                let plans = target.input_settings.derive_plans(&config)?;
                let plan_src = serde_json::to_string_pretty(&plans)?;
                write_output(target.out.as_deref(), &plan_src)
            }
            Command::Rust(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let mut config = target.input_settings.load_config()?;
                if !target.derive.is_empty() {
                    config.derive = target.derive.iter().copied().collect();
                }
                let plans = target.input_settings.derive_plans(&config)?;
                let mut cg = Codegen::new(&plans, &config);
                if !target.no_prelude {
                    cg.emit_prelude();
                }
                cg.emit_all();
                let rust_src = cg.into_string();
                write_output(target.out.as_deref(), &rust_src)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, src: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gderive-cli-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const DOC: &str = r#"{ "types": [
        { "kind": "primitive", "name": "Int" },
        { "kind": "algebraic", "name": "Nat", "parameters": ["n"], "indices": ["n"],
          "constructors": [ { "name": "Zero" }, { "name": "Succ", "fields": ["Nat m"] } ] },
        { "kind": "algebraic", "name": "Shelf", "parameters": ["t"],
          "constructors": [ { "name": "MkShelf", "fields": ["t", "Nat k"] } ] }
    ] }"#;

    #[test]
    fn literal_paths_pass_through_and_empty_globs_fail() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
        let dir = fixture_dir("empty");
        let pattern = format!("{}/*.nothing", dir.display());
        assert!(resolve_file_path_patterns([pattern.as_str()]).is_err());
    }

    #[test]
    fn derive_list_parses_kebab_case() {
        let cli = CommandLineInterface::try_parse_from([
            "gderive", "rust", "-i", "x.json", "--derive", "eq,typed-ord", "-t", "Nat", "-v",
        ])
        .unwrap();
        assert!(cli.verbose());
        let Command::Rust(target) = &cli.cmd else { panic!("expected the rust subcommand") };
        assert_eq!(target.derive, vec![Derivation::Eq, Derivation::TypedOrd]);
        assert_eq!(target.input_settings.types, vec!["Nat".to_string()]);
    }

    #[test]
    fn plan_and_rust_commands_write_outputs() {
        let dir = fixture_dir("run");
        std::fs::write(dir.join("types.json"), DOC).unwrap();
        let input = format!("{}/*.json", dir.display());

        let plan_out = dir.join("out/plans.json").display().to_string();
        let cli = CommandLineInterface::try_parse_from([
            "gderive", "plan", "-i", input.as_str(), "-t", "Shelf", "-o", plan_out.as_str(),
        ])
        .unwrap();
        cli.run().unwrap();
        let plans: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&plan_out).unwrap()).unwrap();
        let names: Vec<&String> = plans.as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["Shelf", "Nat"]);

        let rust_out = dir.join("out/types.rs").display().to_string();
        let cli = CommandLineInterface::try_parse_from([
            "gderive", "rust", "-i", input.as_str(), "--derive", "show", "-o", rust_out.as_str(),
        ])
        .unwrap();
        cli.run().unwrap();
        let src = std::fs::read_to_string(&rust_out).unwrap();
        assert!(src.starts_with("// @generated by gderive"));
        assert!(src.contains("impl<T: ShowPrec> ShowPrec for Shelf<T> {"));
        assert!(src.contains("    MkShelf(T, Box<Nat>),"));
        assert!(!src.contains("impl TypedOrd for Nat"));
    }

    #[test]
    fn unknown_requested_type_is_an_error() {
        let dir = fixture_dir("unknown");
        let path = dir.join("types.json");
        std::fs::write(&path, DOC).unwrap();
        let input = path.display().to_string();
        let out = dir.join("never.json").display().to_string();
        let cli = CommandLineInterface::try_parse_from([
            "gderive", "plan", "-i", input.as_str(), "-t", "Missing", "-o", out.as_str(),
        ])
        .unwrap();
        let err = cli.run().unwrap_err();
        assert!(format!("{err:#}").contains("unknown type `Missing`"));
    }
}
