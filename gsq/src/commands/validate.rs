// gsq/src/commands/validate.rs
//
// USE CASE: Check a configuration offline (no dataset read, no network).

use gsq_core::ports::credential::ConnectionRef;

use crate::cli::ConfigArgs;

pub fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    println!("⚙️  Loading configuration...");
    let config = super::load(&args)?;

    let metrics = match config.check() {
        Ok(metrics) => metrics,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(1);
        }
    };

    for metric in &metrics {
        println!(
            "   ✓ {} (threshold {}, columns: {})",
            metric.per_instance_name(),
            config.thresholds.for_metric(*metric),
            metric.required_columns().join(", ")
        );
    }

    // a bad connection id only aborts a run softly, so this stays a warning
    match ConnectionRef::parse(&config.workspace_connection_arm_id) {
        Ok(conn) if conn.is_test() => println!("   🧪 Test connection: no endpoint will be called"),
        Ok(_) => println!("   🔐 Workspace connection: {}", config.workspace_connection_arm_id),
        Err(e) => println!("   ⚠️  {}", e),
    }

    if config.production_dataset.is_none() {
        println!("   ⚠️  No production_dataset set; pass --dataset to 'gsq run'");
    }

    println!("✅ Configuration valid ({} metric(s))", metrics.len());
    Ok(())
}
