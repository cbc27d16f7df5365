use anyhow::{Context, Result};

use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufWriter;

use crate::args::{Args, Infection};
use crate::config::{Phase, Settings};
use crate::readwrite::{GenotypeIO, SampleWriter, read_antigens_from_path, write_strata_to_file};
use crate::scenario::Scenario;

pub struct Runner {
    args: Args,
    settings: Settings,
    scenario: Scenario,
    rng: StdRng,
    time: f64,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        Self::setup_logger(&args);

        let settings = Self::load_settings(args.settings.as_deref())?;
        let antigens = read_antigens_from_path(&args.antigens)?;

        let seed = args.seed.unwrap_or_else(|| rand::rng().random());
        log::info!("Seeding random number generator with {seed}.");
        let mut rng = StdRng::seed_from_u64(seed);

        println!("Generating naive repertoire...");
        let scenario = Scenario::new(antigens, settings.parameters.clone(), &mut rng)
            .context("Unable to set up the immune system")?;

        Ok(Self {
            args,
            settings,
            scenario,
            rng,
            time: 0.,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        self.run()?;
        self.finish()
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level).unwrap_or_else(|_| {
            eprintln!("Unable to open log file.");
            std::process::exit(1);
        });
    }

    /// Load settings from file, or fall back to the dengue defaults
    fn load_settings(path: Option<&str>) -> Result<Settings> {
        let settings = match path {
            Some(path) => Settings::read_from_file(path)
                .with_context(|| format!("Unable to load settings from {path}"))?,
            None => Settings::default(),
        };
        log::info!("Loaded settings\n{}", settings);
        Ok(settings)
    }

    fn progress_bar(&self) -> Result<Option<ProgressBar>> {
        if self.args.disable_progress_bar {
            return Ok(None);
        }
        let tau = self.settings.parameters.tau;
        let bar = ProgressBar::new(self.settings.schedule.total_units(tau).ceil() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{bar:40}] {pos:>7}/{len:7} [{elapsed_precise} / {duration_precise}] {msg}",
                )?
                .progress_chars("=> "),
        );
        Ok(Some(bar))
    }

    fn run(&mut self) -> Result<()> {
        let bar = self.progress_bar()?;
        let tau = self.settings.parameters.tau;
        let output = format!("{}.txt", self.args.output);
        let mut sample_writer = SampleWriter::<BufWriter<File>>::from_path(
            &output,
            self.scenario.sample_columns(),
            tau,
            self.args.sample_interval,
        )?;
        sample_writer.write_header(&self.scenario.system)?;
        sample_writer.sample(self.time, &self.scenario.system)?;

        let phases: Vec<Phase> = self.settings.schedule.active_phases().cloned().collect();
        let mut offset = 0.;
        for phase in phases {
            let end = offset + phase.units(tau);
            log::info!(
                "Starting phase `{}` at t={:.3} until t={:.3}.",
                phase.name,
                self.time,
                end
            );
            if let Some(bar) = bar.as_ref() {
                bar.set_message(phase.name.clone());
            }

            if phase.inoculation {
                let polyvalent = self.args.infection == Infection::Polyvalent;
                log::info!("Inoculating ({:?}).", self.args.infection);
                self.scenario.inoculate(polyvalent);
            }

            let mut kernel = self.scenario.reactions(phase.kind);
            let mut steps: u64 = 0;
            while self.time < end {
                let Some(dt) = kernel.step(&mut self.scenario.system, &mut self.rng)? else {
                    log::warn!("All reactions exhausted at t={:.3}.", self.time);
                    break;
                };
                self.time += dt;
                steps += 1;
                if sample_writer.sample(self.time, &self.scenario.system)? {
                    log::debug!("Sampled at t={:.3} after {steps} steps.", self.time);
                    if let Some(bar) = bar.as_ref() {
                        bar.set_position(self.time.min(end).floor() as u64);
                    }
                }
            }
            log::info!("Finished phase `{}` after {steps} steps.", phase.name);

            // phases are back to back, the last event may overshoot
            offset = end;
        }
        sample_writer.flush()?;

        if let Some(bar) = bar {
            bar.finish_with_message("Done.");
        }
        log::info!("Finished simulation.");
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        let system = &self.scenario.system;

        log::info!("Storing antibody genotypes...");
        let antibody = system.bcell(self.scenario.compartments.antibody);
        antibody.write_genotypes_to_file(&format!("{}.gen", self.args.output))?;

        log::info!("Storing strata...");
        for antigen in system.antigens().iter() {
            let path = format!("{}.strata.{}.npy", self.args.output, antigen.name());
            write_strata_to_file(antibody, antigen.id(), &path)?;
        }
        log::info!("Finished storing results.");
        Ok(())
    }
}
