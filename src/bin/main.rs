use anyhow::Context;
use sipm_gains::{Config, GainReport, GroupKey};
use std::{env, path::PathBuf};
use structopt::StructOpt;

fn parse_flag(arg: &str) -> Result<bool, String> {
    match arg.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(format!("expected true or false, found {:?}", arg)),
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sipm-gains",
    about = "Plots the SiPM gains of a LED calibration run"
)]
struct Opt {
    /// Calibration results: <PREFIX>_<deviceId>_<YYYYMMDD>_<HHMMSS>.csv
    #[structopt(short, long)]
    file: PathBuf,
    /// Save the plots into the plots directory: true or false.
    /// If false, the plots are written to $TMPDIR/sipm-gains for preview only
    #[structopt(short, long, default_value = "false", parse(try_from_str = parse_flag))]
    save: bool,
    /// Plot the valid channels grouped by modules: true or false
    #[structopt(short, long, default_value = "false", parse(try_from_str = parse_flag))]
    debug: bool,
    /// Channel connections table [default: $SIPM_CONNECTIONS or connections.csv]
    #[structopt(short, long)]
    connections: Option<PathBuf>,
    /// Plots directory [default: $SIPM_PLOTS or plots/SiPM_gain/]
    #[structopt(short, long)]
    output_dir: Option<PathBuf>,
    /// Module label of the channels grouping: ACL or LCM [default: file name prefix]
    #[structopt(short, long)]
    group_by: Option<GroupKey>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = Config::from_env();
    if let Some(path) = opt.connections {
        config = config.connections(path);
    }
    if let Some(path) = opt.output_dir {
        config = config.output_dir(path);
    }

    log::info!("Analysing csv file: {:?}", opt.file);
    let report = GainReport::build(&opt.file, &config, opt.debug, opt.group_by)
        .with_context(|| format!("failed to process {:?}", opt.file))?;
    report.table.summary();

    let dir = if opt.save {
        config.save_path().to_path_buf()
    } else {
        env::temp_dir().join("sipm-gains")
    };
    for path in report.save(&dir)? {
        if opt.save {
            log::info!("Saving file as: {:?}", path);
        } else {
            log::info!("Preview: {:?}", path);
        }
    }

    Ok(())
}
