//! `device-setter` — validates and atomically persists typed `key=value`
//! rows into the sysconf tree.

use clap::{Parser, ValueEnum};
use device_shell::config::SetterConfig;
use device_shell::fs::RealFs;
use device_shell::setter::validators::{self, Pair, ValueType};
use device_shell::setter::{self, InputValue};
use device_shell::userdb::SystemUserDb;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Add,
    Set,
    Remove,
    Mark,
}

#[derive(Parser, Debug)]
#[command(name = "device-setter", about = "Typed-value setter: validate and atomically persist config rows")]
struct Cli {
    /// Required unless `--complete` is set.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// The row's index value (e.g. a row name or number). Required unless
    /// `--complete` is set.
    #[arg(long)]
    index: Option<String>,

    /// Registered pair in `key:type[:opts]` form (e.g. `port:port`,
    /// `name:index`, `iface:select:bases=/etc/ifaces`,
    /// `user:user:groups=wheel|admin,optional`). Repeatable. The index pair
    /// must also appear here.
    #[arg(long = "pair")]
    pairs: Vec<String>,

    /// Positional `key=value` arguments to validate and persist. In
    /// `--complete` mode this is instead the discovery argv (alternating
    /// ancestor key/value pairs followed by the partially-typed token to
    /// complete), matching the `-c` argv shape the shell's discovery
    /// sub-protocol constructs (spec §4.3/§6).
    values: Vec<String>,

    #[arg(long)]
    json: bool,

    /// Emit `-`/`*`-prefixed candidate lines for the final positional
    /// argument instead of validating and committing (spec §4.5/§6).
    #[arg(short = 'c', long = "complete")]
    complete: bool,
}

/// Parse one `--pair key:type[:opt,opt,...]` flag. Opts are comma-separated;
/// each is either the bare flag `optional` or a `name=value` setting, with
/// `|`-separated lists for multi-valued settings (`bases=`, `groups=`).
/// Recognised opts: `bases` (select/symlink), `suffix` (symlink's required
/// suffix), `filesuffix` (the pair's on-disk filename suffix), `min`/`max`
/// (bytes bounds, sql-id length bounds), `groups` (user).
fn parse_pair_spec(spec: &str, index_key: &str) -> Result<Pair, String> {
    let mut parts = spec.splitn(3, ':');
    let key = match parts.next() {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => return Err(format!("invalid --pair '{spec}': missing key")),
    };
    let type_name = parts.next().ok_or_else(|| format!("invalid --pair '{spec}': missing type"))?;
    let opts_str = parts.next().unwrap_or("");

    let mut optional = false;
    let mut suffix = String::new();
    let mut bases: Vec<String> = Vec::new();
    let mut required_suffix: Option<String> = None;
    let mut min: Option<u64> = None;
    let mut max: Option<u64> = None;
    let mut groups: Vec<String> = Vec::new();

    for opt in opts_str.split(',').filter(|o| !o.is_empty()) {
        if opt == "optional" {
            optional = true;
            continue;
        }
        let (name, value) = opt
            .split_once('=')
            .ok_or_else(|| format!("invalid --pair '{spec}': unrecognized option '{opt}'"))?;
        match name {
            "base" | "bases" => bases = value.split('|').map(str::to_string).collect(),
            "suffix" => required_suffix = Some(value.to_string()),
            "filesuffix" => suffix = value.to_string(),
            "min" => min = Some(value.parse().map_err(|_| format!("invalid --pair '{spec}': bad min '{value}'"))?),
            "max" => max = Some(value.parse().map_err(|_| format!("invalid --pair '{spec}': bad max '{value}'"))?),
            "groups" => groups = value.split('|').map(str::to_string).collect(),
            other => return Err(format!("invalid --pair '{spec}': unrecognized option '{other}'")),
        }
    }

    let type_tag = match type_name {
        "index" => ValueType::Index,
        "port" => ValueType::Port,
        "unprivileged-port" => ValueType::UnprivilegedPort,
        "hostname" => ValueType::Hostname,
        "fqdn" => ValueType::Fqdn,
        "select" => ValueType::Select { bases },
        "bytes" => ValueType::Bytes { min, max },
        "symlink" => ValueType::Symlink { bases, required_suffix },
        "sql-id" => ValueType::SqlIdRegular { min: min.map(|m| m as usize).unwrap_or(1), max: max.map(|m| m as usize).unwrap_or(63) },
        "sql-id-delimited" => ValueType::SqlIdDelimited { min: min.map(|m| m as usize).unwrap_or(1), max: max.map(|m| m as usize).unwrap_or(63) },
        "user" => ValueType::User { groups },
        "dn" => ValueType::Rfc4514Dn,
        other => return Err(format!("invalid --pair '{spec}': unknown type '{other}'")),
    };
    Ok(Pair { is_index: key == index_key, key, suffix, type_tag, optional })
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("device-setter: {message}");
    std::process::exit(2);
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = SetterConfig::from_env();
    let fs = RealFs::new();
    let userdb = SystemUserDb::new();

    let index_key = cli
        .pairs
        .iter()
        .find_map(|p| {
            let mut parts = p.splitn(3, ':');
            let key = parts.next()?;
            let ty = parts.next()?;
            (ty == "index").then(|| key.to_string())
        })
        .unwrap_or_else(|| "index".to_string());

    let pairs: Vec<Pair> = match cli.pairs.iter().map(|p| parse_pair_spec(p, &index_key)).collect() {
        Ok(pairs) => pairs,
        Err(e) => fail(e),
    };

    if cli.complete {
        let token = cli.values.last().map(|s| s.as_str()).unwrap_or("");
        for line in validators::complete_token(&pairs, token, &fs, &userdb) {
            println!("{line}");
        }
        std::process::exit(0);
    }

    let values: Vec<InputValue> = cli
        .values
        .iter()
        .filter_map(|v| v.split_once('=').map(|(k, val)| InputValue { key: k.to_string(), raw_value: val.to_string() }))
        .collect();

    let Some(mode) = cli.mode else { fail("--mode is required unless --complete is set") };
    let Some(index) = cli.index.clone() else { fail("--index is required unless --complete is set") };

    let result = match mode {
        ModeArg::Add => setter::run_add(&fs, &userdb, &config.sysconf_root, &pairs, &values, 0o022).map(|_| ()),
        ModeArg::Set => setter::run_set(&fs, &userdb, &config.sysconf_root, &index, &pairs, &values, 0o022),
        ModeArg::Remove => {
            let expected: Vec<String> = pairs.iter().map(|p| format!("{}{}", p.key, p.suffix)).collect();
            setter::run_remove(&fs, &config.sysconf_root, &index, &expected)
        }
        ModeArg::Mark => setter::run_mark(&fs, &config.sysconf_root, &index),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            if cli.json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("{e}");
            }
            std::process::exit(2);
        }
    }
}
