use std::{env, fs, path::PathBuf};

use explore::{ExploreConfig, ExploreRegistry, MetricQuery, SqlBuilder, UserAttributes};
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!("Usage: print_sql <explores_dir> <explore_name> <query_json> [attribute=value ...]");
    eprintln!("Example: cargo run --example print_sql -- examples/explores orders examples/queries/revenue_by_status.json country=US");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.len() < 3 {
        usage();
        std::process::exit(1);
    }

    let explores_dir = PathBuf::from(args.remove(0));
    let explore_name = args.remove(0);
    let query_path = PathBuf::from(args.remove(0));
    let mut attributes = UserAttributes::new();
    for pair in args {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected attribute=value, got {pair}"))?;
        attributes.insert(name.to_string(), value.to_string());
    }

    let config = ExploreConfig::load_default();
    let registry = ExploreRegistry::load_from_dir(explores_dir, &config)?;
    let explore = registry
        .get(&explore_name)
        .ok_or_else(|| anyhow::anyhow!("unknown explore {explore_name}"))?;

    let query_str = fs::read_to_string(query_path)?;
    let query: MetricQuery = serde_json::from_str(&query_str)?;

    let builder = SqlBuilder::new(config.for_explore(&explore_name).query);
    let sql = builder.build_with_attributes(&explore, &query, &attributes)?;
    println!("{sql}");
    Ok(())
}
