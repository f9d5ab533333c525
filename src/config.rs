//! Command line configuration.

use std::{path::PathBuf, str::FromStr};

use crate::{
    error::{Error, Result},
    escape::DEFAULT_MAX_ITERATIONS,
    screen,
    view::ViewParameters,
};

pub const USAGE: &str = "\
usage: hsv-mandelbrot [options]

options:
    --center X,Y            centre of the view in the complex plane (default -0.5,0)
    --range W,H             width and height of the visible region (default 3.5,2)
    --max-iterations N      iteration cap per pixel (default 1000)
    --threads N             CPU threads for preview and headless rendering (default: all cores)
    --output PATH           render to a PNG file on the CPU instead of opening a window
    --size WxH              resolution of --output (default 1920x1080)
    -h, --help              print this message

Logging is configured with RUST_LOG.";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub center: [f32; 2],
    pub range: [f32; 2],
    pub max_iterations: u32,
    pub threads: usize,
    pub output: Option<PathBuf>,
    pub output_size: screen::Size,
    pub help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            center: ViewParameters::DEFAULT_CENTER,
            range: ViewParameters::DEFAULT_RANGE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            threads: num_cpus::get(),
            output: None,
            output_size: screen::Size::new(1920, 1080),
            help: false,
        }
    }
}

impl Config {
    /// Parse arguments, not including the program name.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(flag) = args.next() {
            match flag.as_str() {
                "-h" | "--help" => config.help = true,
                "--center" => {
                    config.center = parse_point(&flag, &next_value(&mut args, &flag)?)?;
                }
                "--range" => {
                    let value = next_value(&mut args, &flag)?;
                    let range = parse_point(&flag, &value)?;
                    if range.iter().any(|extent| *extent <= 0.0) {
                        return Err(invalid(&flag, &value, "a positive extent"));
                    }
                    config.range = range;
                }
                "--max-iterations" => {
                    let value = next_value(&mut args, &flag)?;
                    config.max_iterations = match value.parse() {
                        Ok(max_iterations) if max_iterations > 0 => max_iterations,
                        _ => return Err(invalid(&flag, &value, "a positive integer")),
                    };
                }
                "--threads" => {
                    let value = next_value(&mut args, &flag)?;
                    config.threads = match value.parse() {
                        Ok(threads) if threads > 0 => threads,
                        _ => return Err(invalid(&flag, &value, "a positive integer")),
                    };
                }
                "--output" => {
                    config.output = Some(PathBuf::from(next_value(&mut args, &flag)?));
                }
                "--size" => {
                    let value = next_value(&mut args, &flag)?;
                    let [width, height]: [u32; 2] = parse_pair(&flag, &value, 'x')?;
                    let size = screen::Size::new(width, height);
                    if size.is_empty() {
                        return Err(invalid(&flag, &value, "a non-zero size"));
                    }
                    config.output_size = size;
                }
                _ => return Err(Error::UnknownArgument(flag.clone())),
            }
        }

        Ok(config)
    }

    pub fn view_parameters(&self, screen_dimensions: screen::Size) -> ViewParameters {
        ViewParameters::new(self.center, self.range, screen_dimensions)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| Error::MissingValue(flag.to_string()))
}

fn invalid(flag: &str, value: &str, expected: &'static str) -> Error {
    Error::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn parse_pair<A: FromStr>(flag: &str, value: &str, separator: char) -> Result<[A; 2]> {
    let expected = if separator == 'x' {
        "WIDTHxHEIGHT"
    } else {
        "two comma separated numbers"
    };

    let (first, second) = value
        .split_once(separator)
        .ok_or_else(|| invalid(flag, value, expected))?;

    match (first.trim().parse(), second.trim().parse()) {
        (Ok(first), Ok(second)) => Ok([first, second]),
        _ => Err(invalid(flag, value, expected)),
    }
}

/// A pair of floats. `f32::from_str` accepts `NaN` and `inf`, neither of which maps to a point.
fn parse_point(flag: &str, value: &str) -> Result<[f32; 2]> {
    let point: [f32; 2] = parse_pair(flag, value, ',')?;
    if point.iter().all(|coordinate| coordinate.is_finite()) {
        Ok(point)
    } else {
        Err(invalid(flag, value, "finite numbers"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        Config::from_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn no_arguments_gives_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_iterations, 1000);
        assert!(config.threads > 0);
        assert!(config.output.is_none());
    }

    #[test]
    fn parses_every_option() {
        let config = parse(&[
            "--center",
            "0.25,-0.5",
            "--range",
            "1,0.5",
            "--max-iterations",
            "64",
            "--threads",
            "3",
            "--output",
            "out/mandelbrot.png",
            "--size",
            "640x480",
        ])
        .unwrap();

        assert_eq!(config.center, [0.25, -0.5]);
        assert_eq!(config.range, [1.0, 0.5]);
        assert_eq!(config.max_iterations, 64);
        assert_eq!(config.threads, 3);
        assert_eq!(config.output, Some(PathBuf::from("out/mandelbrot.png")));
        assert_eq!(config.output_size, screen::Size::new(640, 480));
        assert!(!config.help);
    }

    #[test]
    fn help_flag() {
        assert!(parse(&["-h"]).unwrap().help);
        assert!(parse(&["--help"]).unwrap().help);
    }

    #[test]
    fn rejects_zero_size() {
        assert!(matches!(
            parse(&["--size", "0x480"]),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_range() {
        assert!(matches!(
            parse(&["--range", "0,1"]),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["--range", "1,-2"]),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        for args in [
            ["--center", "NaN,0"],
            ["--center", "inf,0"],
            ["--center", "0,-infinity"],
            ["--range", "inf,1"],
            ["--range", "1,NaN"],
        ] {
            assert!(
                matches!(
                    parse(&args),
                    Err(Error::InvalidValue { expected: "finite numbers", .. })
                ),
                "{:?} should be rejected",
                args
            );
        }
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            parse(&["--center", "1;2"]),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["--max-iterations", "0"]),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["--threads", "many"]),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_missing_and_unknown() {
        assert!(matches!(
            parse(&["--output"]),
            Err(Error::MissingValue(flag)) if flag == "--output"
        ));
        assert!(matches!(
            parse(&["--zoom", "2"]),
            Err(Error::UnknownArgument(flag)) if flag == "--zoom"
        ));
    }

    #[test]
    fn view_parameters_use_configured_region() {
        let config = parse(&["--center", "1,2", "--range", "3,4"]).unwrap();
        let params = config.view_parameters(screen::Size::new(10, 20));
        assert_eq!(params.center, [1.0, 2.0]);
        assert_eq!(params.range, [3.0, 4.0]);
        assert_eq!(params.screen_dimensions, screen::Size::new(10, 20));
    }
}
