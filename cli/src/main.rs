use std::fs;
use std::path::PathBuf;

use clap::Parser;

use chakravyuha_core::cff::FlattenConfig;
use chakravyuha_core::fakecode;
use chakravyuha_core::pass::{ControlFlowFlattenPass, ModulePass, StringEncryptPass};
use chakravyuha_core::report::GLOBAL_REPORT;
use chakravyuha_core::se::StringEncryptConfig;
use chakravyuha_ir::{Function, Module, ReferenceVerifier, Verifier};

mod config;
mod irfile;

use config::{ObfuscationPass, YamlConfig, YAML_CONFIG_VERSION};

/// Commandline harness for the chakravyuha obfuscation engine.
#[derive(Parser, Debug)]
#[command(name = "chakravyuha-cli")]
#[command(about = "Runs string encryption and control-flow flattening over a module", long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,
    /// Name of the profile (within the config) to apply. Defaults to the first profile.
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: log::LevelFilter,
    /// Input module, in this crate's textual IR format (see `irfile`).
    #[arg(long, value_name = "INPUT")]
    pub input: PathBuf,
    /// Output path for the transformed module's textual dump.
    #[arg(long, value_name = "OUTPUT")]
    pub output: PathBuf,
    /// Output path for the JSON transformation report. Printed to stdout if omitted.
    #[arg(long, value_name = "REPORT")]
    pub report: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    env_logger::builder().filter_level(cli.log_level).init();

    let config_contents = fs::read_to_string(&cli.config)?;
    let config: YamlConfig = serde_yaml::from_str(&config_contents)?;
    if config.version != YAML_CONFIG_VERSION {
        log::warn!("config version `{}` does not match this CLI's `{}`; proceeding anyway", config.version, YAML_CONFIG_VERSION);
    }

    let profile = match &cli.profile {
        Some(name) => config.profile(name).ok_or_else(|| format!("profile `{name}` not found in config"))?,
        None => config.profiles.first().ok_or("config defines no profiles")?,
    };
    log::info!("applying profile `{}` ({} pass(es))", profile.name, profile.passes.len());

    let source = fs::read_to_string(&cli.input)?;
    let mut module = irfile::parse_module(&source)?;
    log::info!("parsed module `{}`: {} function(s), {} global(s)", module.name, module.functions().count(), module.globals().count());

    for pass_cfg in &profile.passes {
        match pass_cfg {
            ObfuscationPass::StringEncrypt(settings) => {
                let se_config = StringEncryptConfig { key_override: settings.key, filter_by_prefix: settings.name_prefix.clone() };
                StringEncryptPass { config: se_config, seed: config.seed }.run(&mut module);
            }
            ObfuscationPass::ControlFlowFlatten(settings) => {
                let cff_config = FlattenConfig { min_block_count: settings.min_block_count, seed: config.seed };
                ControlFlowFlattenPass { config: cff_config, seed: config.seed }.run(&mut module);
            }
            ObfuscationPass::FakeCode(settings) => {
                if settings.enabled {
                    run_fakecode(&mut module);
                }
            }
        }
    }

    if let Err(e) = ReferenceVerifier.verify_module(&module) {
        log::error!("transformed module failed verification: {e}");
        return Err(e.to_string().into());
    }
    log::info!("module verified successfully");

    fs::write(&cli.output, irfile::dump_module(&module))?;
    log::info!("wrote transformed module to {:?}", cli.output);

    let report = GLOBAL_REPORT.lock().expect("report mutex poisoned").clone();
    let report_json = serde_json::to_string_pretty(&report)?;
    match &cli.report {
        Some(path) => {
            fs::write(path, report_json)?;
            log::info!("wrote report to {path:?}");
        }
        None => println!("{report_json}"),
    }

    log::info!(
        "done: {} string(s) encrypted, {} function(s) flattened, {} function(s) skipped",
        report.strings_encrypted,
        report.functions_flattened,
        report.functions_skipped.len()
    );
    Ok(())
}

/// Applies fake-code insertion to the first unconditionally-branching
/// block of every function CFF would also consider eligible. Stylistic
/// only (spec.md §1); runs after CFF in every profile that lists both,
/// since flattening already collapses the original branch structure
/// this pass would otherwise target.
fn run_fakecode(module: &mut Module) {
    let function_ids: Vec<_> = module.functions().collect();
    for fid in function_ids {
        let name = module.function(fid).name.clone();
        if module.function(fid).is_declaration || module.function(fid).is_intrinsic {
            continue;
        }
        let blocks: Vec<_> = module.function(fid).blocks().collect();

        // Same split-borrow problem `cff::run_one` solves: insert_dead_branch
        // needs `&mut Module` and `&mut Function` at once.
        let placeholder = Function::declaration(name, vec![], None);
        let mut func = std::mem::replace(module.function_mut(fid), placeholder);
        for block in blocks {
            if fakecode::insert_dead_branch(module, &mut func, block) {
                break;
            }
        }
        *module.function_mut(fid) = func;
    }
}
