// Command-line front end for the allocator and the bench hardware

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::amdc::{AmdcError, AmdcLink, Cramb};
use crate::bearing::{
    BearingModel, CurrentUnits, ForceAllocator, ForceVector, PhysicalBearing, PoleVector,
    Saturable,
};
use crate::config::{root_strategy, Bearing, BearingConfig};
use crate::logs::extract_averages;
use crate::messages::{CurrentsReport, QueueCommand, QueueEntry, RatingReport};
use crate::queue::{run_interactive, CommandExecutor, CommandQueue};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Parser)]
#[command(
    name = "cramb",
    about = "Force allocation for a 3-pole combined radial-axial magnetic bearing"
)]
pub struct Cli {
    /// Bearing description (JSON); defaults to the prototype curve fit
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Solve the quartic in closed form instead of by eigenvalues
    #[arg(long, global = true)]
    pub analytic: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Minimum-norm control currents for a radial force
    Currents {
        /// Force direction (degrees)
        #[arg(allow_negative_numbers = true)]
        direction: f64,
        /// Force magnitude (N)
        magnitude: f64,
        /// Report ampere-turns instead of amps
        #[arg(long)]
        ampere_turns: bool,
        /// Keep saturated candidates
        #[arg(long)]
        no_saturation_check: bool,
    },
    /// Force produced by three phase currents (A)
    Force {
        #[arg(allow_negative_numbers = true)]
        i1: f64,
        #[arg(allow_negative_numbers = true)]
        i2: f64,
        #[arg(allow_negative_numbers = true)]
        i3: f64,
    },
    /// Every inverse-solution candidate for a radial force
    Candidates {
        #[arg(allow_negative_numbers = true)]
        direction: f64,
        magnitude: f64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Largest force in a direction before saturation (physical model)
    MaxForce {
        #[arg(allow_negative_numbers = true)]
        direction: f64,
    },
    /// Force available in every direction (physical model)
    Rated,
    /// Print the bearing parameters
    Params,
    /// Send one raw command to the AMDC
    Send {
        #[arg(long)]
        port: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Step through a JSON command list under keyboard control
    Queue {
        #[arg(long)]
        port: String,
        file: PathBuf,
    },
    /// Average force/torque sensor logs
    Average {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    fn bearing(&self) -> CliResult<Bearing> {
        let config = match &self.config {
            Some(path) => BearingConfig::load(path)?,
            None => BearingConfig::default(),
        };
        Ok(config.build()?)
    }

    fn allocator(&self) -> CliResult<ForceAllocator<Bearing>> {
        Ok(ForceAllocator::new(self.bearing()?, root_strategy(self.analytic)))
    }

    fn physical_allocator(&self) -> CliResult<ForceAllocator<PhysicalBearing>> {
        match self.bearing()? {
            Bearing::Physical(b) => Ok(ForceAllocator::new(b, root_strategy(self.analytic))),
            Bearing::CurveFit(_) => {
                Err("rating needs a physical bearing model (\"model\": \"physical\")".into())
            }
        }
    }
}

/// Execute one parsed command line
pub fn run(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Command::Currents {
            direction,
            magnitude,
            ampere_turns,
            no_saturation_check,
        } => {
            let units = if *ampere_turns {
                CurrentUnits::AmpereTurns
            } else {
                CurrentUnits::Amps
            };
            let currents = cli.allocator()?.control_currents(
                *direction,
                *magnitude,
                units,
                !no_saturation_check,
            )?;
            print_json(&CurrentsReport {
                request: ForceVector::new(*direction, *magnitude),
                currents: currents.into(),
                ampere_turns: *ampere_turns,
            })
        }
        Command::Force { i1, i2, i3 } => {
            let force = cli
                .allocator()?
                .force_from_currents(&PoleVector::new(*i1, *i2, *i3));
            print_json(&force)
        }
        Command::Candidates {
            direction,
            magnitude,
            json,
        } => {
            let report = cli.allocator()?.report(*direction, *magnitude)?;
            if *json {
                print_json(&report)
            } else {
                println!("{}", report);
                Ok(())
            }
        }
        Command::MaxForce { direction } => {
            let allocator = cli.physical_allocator()?;
            print_json(&RatingReport {
                direction_deg: *direction,
                max_force: allocator.max_force(*direction)?,
                hexagon_bound: allocator.model().hexagon_bound(),
            })
        }
        Command::Rated => {
            let allocator = cli.physical_allocator()?;
            let direction = allocator.weakest_direction()?;
            print_json(&RatingReport {
                direction_deg: direction,
                max_force: allocator.max_force(direction)?,
                hexagon_bound: allocator.model().hexagon_bound(),
            })
        }
        Command::Params => {
            print!("{}", cli.bearing()?);
            Ok(())
        }
        Command::Send { port, text } => {
            let mut link = AmdcLink::open(port)?;
            for line in link.cmd(&text.join(" "))? {
                println!("{}", line);
            }
            Ok(())
        }
        Command::Queue { port, file } => {
            let mut queue = CommandQueue::load(file)?;
            let mut executor = BenchExecutor {
                cramb: Cramb::new(AmdcLink::open(port)?),
                allocator: cli.allocator()?,
            };
            run_interactive(&mut queue, &mut executor)?;
            Ok(())
        }
        Command::Average { files } => {
            let mut results = serde_json::Map::new();
            for path in files {
                let averages = extract_averages(path)?;
                results.insert(path.display().to_string(), serde_json::to_value(averages)?);
            }
            print_json(&results)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs queued commands against the bearing drive
pub struct BenchExecutor<T: std::io::Read + std::io::Write, M> {
    pub cramb: Cramb<T>,
    pub allocator: ForceAllocator<M>,
}

impl<T: std::io::Read + std::io::Write, M: BearingModel> CommandExecutor for BenchExecutor<T, M> {
    type Error = AmdcError;

    fn execute(&mut self, entry: &QueueEntry, index: usize) -> Result<(), AmdcError> {
        info!("[{}] {}", index, entry.command);
        match &entry.command {
            QueueCommand::Raw { text } => {
                for line in self.cramb.send(text)? {
                    info!("  {}", line);
                }
            }
            QueueCommand::Force {
                direction_deg,
                magnitude,
            } => {
                self.cramb
                    .apply_force(&self.allocator, *direction_deg, *magnitude)?;
            }
            QueueCommand::Zero => self.cramb.zero()?,
        }
        Ok(())
    }

    fn quit(&mut self) {
        if let Err(e) = self.cramb.zero() {
            warn!("Failed to zero bearing on quit: {}", e);
        }
    }
}
