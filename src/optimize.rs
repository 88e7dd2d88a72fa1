//! The optimizer: parse, run the pipeline, serialize, repeat while it helps.

use log::debug;

use crate::config::Config;
use crate::datauri::encode_data_uri;
use crate::error::SqueezeError;
use crate::parse::parse_svg;
use crate::plugin::{Pipeline, Registry};
use crate::serialize::serialize;

/// Caller-supplied context, echoed back in the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub data: String,
    /// Set when the configuration asks for a data URI.
    pub data_uri: Option<String>,
    /// Number of parse/pipeline/serialize cycles that ran.
    pub passes: usize,
    pub info: Info,
}

/// A configured, reusable optimizer.
pub struct Optimizer {
    pipeline: Pipeline,
    config: Config,
}

impl Optimizer {
    /// Build an optimizer over the built-in plugins.
    pub fn new(config: Config) -> Result<Self, SqueezeError> {
        Self::with_registry(&Registry::builtin(), config)
    }

    /// Build an optimizer whose plugin names resolve against `registry`.
    pub fn with_registry(registry: &Registry, config: Config) -> Result<Self, SqueezeError> {
        let pipeline = Pipeline::new(registry, &config.plugins)?;
        Ok(Self { pipeline, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn optimize(&self, input: &str, info: Info) -> Result<Output, SqueezeError> {
        let max_cycles = if self.config.multipass {
            self.config.max_passes.max(1)
        } else {
            1
        };

        let (data, passes) = converge(input.to_string(), max_cycles, |svg| {
            let doc = parse_svg(svg)?;
            let doc = self.pipeline.run(doc);
            Ok::<_, SqueezeError>(serialize(&doc, &self.config.js2svg))
        })?;

        let data_uri = self.config.datauri.map(|mode| encode_data_uri(&data, mode));
        Ok(Output {
            data,
            data_uri,
            passes,
            info,
        })
    }

    /// [`Optimizer::optimize`] as a future. The work runs on the polling
    /// thread when the future is first polled.
    pub async fn optimize_async(&self, input: &str, info: Info) -> Result<Output, SqueezeError> {
        self.optimize(input, info)
    }
}

/// Run `cycle` repeatedly, feeding each output into the next cycle.
///
/// The first cycle always runs. Another follows while fewer than
/// `max_cycles` have run and the last output is strictly shorter than the
/// one before it. Returns the last output and the number of cycles run.
pub fn converge<E>(
    input: String,
    max_cycles: usize,
    mut cycle: impl FnMut(&str) -> Result<String, E>,
) -> Result<(String, usize), E> {
    let mut current = input;
    let mut previous_len = usize::MAX;
    let mut cycles = 0;

    loop {
        current = cycle(&current)?;
        cycles += 1;
        debug!("cycle {cycles}: {} bytes", current.len());

        if cycles >= max_cycles || current.len() >= previous_len {
            return Ok((current, cycles));
        }
        previous_len = current.len();
    }
}
