// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! `umrs-polquery` — a CLI exposing component H's query API, in the
//! spirit of the incumbent's `sesearch`/`seinfo`/`replcon` tools
//! (SPEC_FULL §4.H supplement).
//!
//! Subcommands:
//! - `rules`    — wraps `query_rules` (component C).
//! - `relabel`  — wraps `relabel_query` (component G), emitting the §6
//!   wire shape as JSON.
//! - `permmap`  — load/save round-trip over the §4.D text grammar.
//! - `cond`     — evaluate or compare conditional expressions (component
//!   E), demonstrating scenario S6.
//!
//! Exit codes follow §6 exactly: `0` success, `1` usage error or no
//! results, `2` invalid policy, `3` I/O error.
// ===========================================================================

mod config;
mod file_contexts;
mod policy_json;
mod wire;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use umrs_policy::db::CondNode;
use umrs_policy::error::{MessageSink, Severity};
use umrs_policy::ids::BoolIndex;
use umrs_policy::{relabel, relabel_query};

#[derive(Parser, Debug)]
#[command(name = "umrs-polquery", version, about = "UMRS policy query toolchain")]
struct Cli {
    /// Path to a policy document in the adapter JSON shape (see
    /// `policy_json.rs`); an already-expanded policy produced by an
    /// external expander (§1) is the core's only accepted input.
    #[arg(short, long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query AV rules by source type / class / permission (component C).
    Rules {
        /// Source type name to filter on.
        #[arg(long)]
        src_type: Option<String>,
        /// Object class names to filter on (any match).
        #[arg(long)]
        class: Vec<String>,
        /// Permission names to filter on (any match).
        #[arg(long)]
        perm: Vec<String>,
        /// Expand attributes indirectly when matching `src_type`.
        #[arg(long)]
        indirect: bool,
    },
    /// Relabel-reachability query (component G).
    Relabel {
        /// Starting subject type (or, in `domain` mode, the domain).
        start_type: String,
        /// Query mode: to, from, both, or domain.
        #[arg(long, default_value = "domain")]
        mode: String,
        /// Restrict to this object class (repeatable).
        #[arg(long)]
        class: Vec<String>,
    },
    /// Load a permission-map file and print its contents back out
    /// (round-trip demonstration of component D).
    Permmap {
        /// Path to a permission-map text file; defaults to the bundled
        /// map if omitted.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Evaluate or compare conditional boolean expressions (component E).
    Cond {
        /// RPN tokens for the first (or only) expression.
        #[arg(long, value_delimiter = ',')]
        expr: Vec<String>,
        /// RPN tokens for a second expression to compare against.
        #[arg(long, value_delimiter = ',')]
        expr2: Vec<String>,
        /// `name=true`/`name=false` boolean assignments for evaluation.
        #[arg(long, value_delimiter = ',')]
        set: Vec<String>,
    },
    /// Parse and list entries from a file-contexts document (§6 adapter).
    Fcontext {
        /// Path to a file-contexts text file.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Maps a failure to the §6 exit-code taxonomy. I/O failures (file not
/// found, permission denied) map to `3`; anything from the policy loader
/// or query engine maps to `2`; everything else (a usage mistake this
/// function didn't already catch) falls back to `1`.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<std::io::Error>().is_some() {
        return 3;
    }
    if err.downcast_ref::<umrs_policy::error::PolicyError>().is_some() {
        return 2;
    }
    1
}

fn load_policy_file(path: &PathBuf) -> anyhow::Result<umrs_policy::PolicyDb> {
    let text = fs::read_to_string(path)?;
    let doc: policy_json::PolicyDoc = serde_json::from_str(&text)?;
    let mut sink = MessageSink::with_handler(|severity, message| match severity {
        Severity::Error => log::error!("{message}"),
        Severity::Warning => log::warn!("{message}"),
        Severity::Info => log::info!("{message}"),
    });
    policy_json::load(&doc, &mut sink)
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Rules {
            src_type,
            class,
            perm,
            indirect,
        } => run_rules(cli, src_type.as_deref(), class, perm, *indirect),
        Command::Relabel { start_type, mode, class } => run_relabel(cli, start_type, mode, class),
        Command::Permmap { file } => run_permmap(file.as_ref()),
        Command::Cond { expr, expr2, set } => run_cond(expr, expr2, set),
        Command::Fcontext { file } => run_fcontext(file),
    }
}

fn require_policy(cli: &Cli) -> anyhow::Result<umrs_policy::PolicyDb> {
    let Some(path) = &cli.policy else {
        anyhow::bail!("--policy <file> is required for this subcommand");
    };
    load_policy_file(path)
}

fn run_rules(
    cli: &Cli,
    src_type: Option<&str>,
    classes: &[String],
    perms: &[String],
    indirect: bool,
) -> anyhow::Result<ExitCode> {
    let db = require_policy(cli)?;

    let type_filter = match src_type {
        Some(name) => {
            let idx = db
                .types
                .lookup_by_name(name)
                .ok_or_else(|| anyhow::anyhow!("unknown type '{name}'"))?;
            Some((
                idx,
                umrs_policy::query::ListSelector::Source,
                if indirect {
                    umrs_policy::query::IndirectMode::Indirect
                } else {
                    umrs_policy::query::IndirectMode::Direct
                },
            ))
        }
        None => None,
    };

    let class_filter = names_to_class_set(&db, classes)?;
    let perm_filter = names_to_perm_set(&db, perms)?;

    let filter = umrs_policy::query::RuleFilter {
        type_filter,
        class_filter,
        perm_filter,
    };

    let matches = umrs_policy::query_rules(&db, &filter)?;
    if matches.is_empty() {
        println!("no rules matched");
        return Ok(ExitCode::from(1));
    }

    for idx in matches {
        let rule = &db.av_rules[idx as usize];
        println!("rule #{idx} (line {}): {:?}", rule.source_line, rule.kind);
    }
    Ok(ExitCode::SUCCESS)
}

fn names_to_class_set(
    db: &umrs_policy::PolicyDb,
    names: &[String],
) -> anyhow::Result<Option<std::collections::BTreeSet<umrs_policy::ids::ClassIndex>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let mut set = std::collections::BTreeSet::new();
    for name in names {
        let idx = db
            .classes
            .lookup_by_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown class '{name}'"))?;
        set.insert(idx);
    }
    Ok(Some(set))
}

fn names_to_perm_set(
    db: &umrs_policy::PolicyDb,
    names: &[String],
) -> anyhow::Result<Option<std::collections::BTreeSet<umrs_policy::ids::PermIndex>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let mut set = std::collections::BTreeSet::new();
    for name in names {
        let idx = db
            .perms
            .lookup_by_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown permission '{name}'"))?;
        set.insert(idx);
    }
    Ok(Some(set))
}

fn run_relabel(cli: &Cli, start_type: &str, mode: &str, classes: &[String]) -> anyhow::Result<ExitCode> {
    let db = require_policy(cli)?;

    let start = db
        .types
        .lookup_by_name(start_type)
        .ok_or_else(|| anyhow::anyhow!("unknown type '{start_type}'"))?;

    let mode = match mode {
        "to" => relabel_query::Mode::To,
        "from" => relabel_query::Mode::From,
        "both" => relabel_query::Mode::Both,
        "domain" => relabel_query::Mode::Domain,
        other => anyhow::bail!("unknown relabel mode '{other}' (expected to/from/both/domain)"),
    };

    let filter = if classes.is_empty() {
        None
    } else {
        let mut f = relabel_query::RelabelFilter::new();
        for name in classes {
            let idx = db
                .classes
                .lookup_by_name(name)
                .ok_or_else(|| anyhow::anyhow!("unknown class '{name}'"))?;
            f.allow_class(idx, std::collections::BTreeSet::new());
        }
        Some(f)
    };

    let sets = relabel::build_relabel_sets(&db);
    let results = relabel_query::relabel_query(&sets, start, mode, filter.as_ref());

    if results.is_empty() {
        println!("[]");
        return Ok(ExitCode::from(1));
    }

    let wire = wire::to_wire(&db, &results);
    println!("{}", serde_json::to_string_pretty(&wire)?);
    Ok(ExitCode::SUCCESS)
}

fn run_permmap(file: Option<&PathBuf>) -> anyhow::Result<ExitCode> {
    let text = match file {
        Some(path) => fs::read_to_string(path)?,
        None => match config::find_default_file("perm_map.conf") {
            Some(path) => fs::read_to_string(path)?,
            None => umrs_policy::DEFAULT_PERM_MAP.to_string(),
        },
    };

    let mut sink = MessageSink::with_handler(|severity, message| match severity {
        Severity::Error => log::error!("{message}"),
        Severity::Warning => log::warn!("{message}"),
        Severity::Info => log::info!("{message}"),
    });

    let map = match umrs_policy::load_permission_map(&text, &[], &[], &mut sink) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("error: malformed permission map: {e}");
            return Ok(ExitCode::from(2));
        }
    };

    print!("{}", umrs_policy::save_permission_map(&map));
    Ok(ExitCode::SUCCESS)
}

fn parse_bool_assignments(
    set: &[String],
) -> anyhow::Result<std::collections::HashMap<String, bool>> {
    let mut map = std::collections::HashMap::new();
    for assignment in set {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected name=true|false, got '{assignment}'"))?;
        let value = match value {
            "true" => true,
            "false" => false,
            other => anyhow::bail!("expected true/false, got '{other}'"),
        };
        map.insert(name.to_string(), value);
    }
    Ok(map)
}

fn parse_rpn(tokens: &[String], booleans: &mut Vec<String>) -> Vec<RpnToken> {
    tokens
        .iter()
        .map(|t| match t.as_str() {
            "!" | "not" => RpnToken::Op(CondNode::Not),
            "||" | "or" => RpnToken::Op(CondNode::Or),
            "&&" | "and" => RpnToken::Op(CondNode::And),
            "^" | "xor" => RpnToken::Op(CondNode::Xor),
            "==" | "eq" => RpnToken::Op(CondNode::Eq),
            "!=" | "neq" => RpnToken::Op(CondNode::Neq),
            name => {
                let idx = booleans.iter().position(|b| b == name).unwrap_or_else(|| {
                    booleans.push(name.to_string());
                    booleans.len() - 1
                });
                RpnToken::Bool(idx)
            }
        })
        .collect()
}

enum RpnToken {
    Op(CondNode),
    Bool(usize),
}

fn resolve_rpn(tokens: &[RpnToken]) -> Vec<CondNode> {
    tokens
        .iter()
        .map(|t| match t {
            RpnToken::Op(op) => *op,
            RpnToken::Bool(idx) => CondNode::Bool(BoolIndex::new(*idx as u32)),
        })
        .collect()
}

fn run_fcontext(file: &PathBuf) -> anyhow::Result<ExitCode> {
    let text = fs::read_to_string(file)?;
    let (entries, warnings) = file_contexts::parse(&text);

    for warning in &warnings {
        log::warn!("line {}: {}", warning.line, warning.message);
    }

    for entry in &entries {
        let context = entry
            .context
            .as_ref()
            .map_or_else(|| "<<none>>".to_string(), ToString::to_string);
        println!("{}\t{:?}\t{}", entry.path_glob, entry.file_type, context);
    }

    if entries.is_empty() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_cond(expr: &[String], expr2: &[String], set: &[String]) -> anyhow::Result<ExitCode> {
    if expr.is_empty() {
        anyhow::bail!("--expr is required");
    }

    let mut booleans = Vec::new();
    let lhs_tokens = parse_rpn(expr, &mut booleans);
    let lhs = resolve_rpn(&lhs_tokens);

    if !expr2.is_empty() {
        let rhs_tokens = parse_rpn(expr2, &mut booleans);
        let rhs = resolve_rpn(&rhs_tokens);
        let equivalence = umrs_policy::condeval::compare_equivalence(&lhs, &rhs);
        println!("{equivalence:?}");
        return Ok(ExitCode::SUCCESS);
    }

    let assignments = parse_bool_assignments(set)?;
    let lookup = |idx: BoolIndex| -> Option<bool> {
        booleans
            .get(idx.value() as usize)
            .and_then(|name| assignments.get(name))
            .copied()
    };
    let result = umrs_policy::evaluate_condition(&lhs, &lookup);
    println!("{result:?}");
    Ok(ExitCode::SUCCESS)
}
