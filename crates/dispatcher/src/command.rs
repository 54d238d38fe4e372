//! Command-line grammar. A line is split on whitespace; no quoting or escaping.

use registry::DEFAULT_NETWORK_DRIVER;
use shared::{
    domain::{ImageRef, Mount},
    error::CommandError,
};

pub const PROGRAM: &str = "docker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunArgs),
    Ps(PsArgs),
    Images(ImagesArgs),
    Pull(PullArgs),
    Start(ContainerTarget),
    Stop(ContainerTarget),
    Restart(ContainerTarget),
    Rm(RmArgs),
    Rmi(RmiArgs),
    Container(ContainerCommand),
    Image(ImageCommand),
    Volume(VolumeCommand),
    Network(NetworkCommand),
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Ps(_) => "ps",
            Self::Images(_) => "images",
            Self::Pull(_) => "pull",
            Self::Start(_) => "start",
            Self::Stop(_) => "stop",
            Self::Restart(_) => "restart",
            Self::Rm(_) => "rm",
            Self::Rmi(_) => "rmi",
            Self::Container(_) => "container",
            Self::Image(_) => "image",
            Self::Volume(_) => "volume",
            Self::Network(_) => "network",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Ps(_)
                | Self::Images(_)
                | Self::Container(ContainerCommand::Inspect { .. })
                | Self::Image(ImageCommand::Inspect { .. })
                | Self::Volume(VolumeCommand::Ls { .. } | VolumeCommand::Inspect { .. })
                | Self::Network(NetworkCommand::Ls { .. } | NetworkCommand::Inspect { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub image: ImageRef,
    pub ports: Option<String>,
    pub name: Option<String>,
    pub network: Option<String>,
    pub mounts: Vec<Mount>,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PsArgs {
    pub all: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImagesArgs {
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullArgs {
    pub image: ImageRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmArgs {
    pub reference: String,
    pub force: bool,
}

/// `reference` is a `repository[:tag]` or an image id prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmiArgs {
    pub reference: String,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCommand {
    Inspect { reference: String },
    Prune,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCommand {
    Inspect { reference: String },
    /// Without `all` only dangling images go, and the registry never holds any.
    Prune { all: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeCommand {
    Create { name: String },
    Ls { quiet: bool },
    Rm { name: String, force: bool },
    Inspect { name: String },
    Prune,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCommand {
    Create { name: String, driver: String },
    Ls { quiet: bool },
    Rm { name: String },
    Inspect { name: String },
    Connect { network: String, container: String },
    Disconnect { network: String, container: String, force: bool },
    Prune,
}

/// Flags a subcommand understands: `(alias, canonical)` pairs.
struct FlagSpec {
    values: &'static [(&'static str, &'static str)],
    switches: &'static [(&'static str, &'static str)],
    /// Everything after the first positional is passed through untouched.
    stop_at_positional: bool,
}

const RUN_FLAGS: FlagSpec = FlagSpec {
    values: &[
        ("-p", "publish"),
        ("--publish", "publish"),
        ("--name", "name"),
        ("--network", "network"),
        ("--net", "network"),
        ("-v", "volume"),
        ("--volume", "volume"),
        ("-e", "env"),
        ("--env", "env"),
    ],
    switches: &[
        ("-d", "detach"),
        ("--detach", "detach"),
        ("-i", "interactive"),
        ("--interactive", "interactive"),
        ("-t", "tty"),
        ("--tty", "tty"),
        ("-it", "interactive"),
        ("-ti", "interactive"),
        ("--rm", "rm"),
    ],
    stop_at_positional: true,
};

const PS_FLAGS: FlagSpec = FlagSpec {
    values: &[],
    switches: &[
        ("-a", "all"),
        ("--all", "all"),
        ("-q", "quiet"),
        ("--quiet", "quiet"),
        ("-aq", "all-quiet"),
        ("-qa", "all-quiet"),
    ],
    stop_at_positional: false,
};

const QUIET_FLAGS: FlagSpec = FlagSpec {
    values: &[],
    switches: &[("-q", "quiet"), ("--quiet", "quiet")],
    stop_at_positional: false,
};

const FORCE_FLAGS: FlagSpec = FlagSpec {
    values: &[],
    switches: &[("-f", "force"), ("--force", "force")],
    stop_at_positional: false,
};

const IMAGE_PRUNE_FLAGS: FlagSpec = FlagSpec {
    values: &[],
    switches: &[
        ("-a", "all"),
        ("--all", "all"),
        ("-f", "force"),
        ("--force", "force"),
    ],
    stop_at_positional: false,
};

const NETWORK_CREATE_FLAGS: FlagSpec = FlagSpec {
    values: &[("-d", "driver"), ("--driver", "driver")],
    switches: &[],
    stop_at_positional: false,
};

const NO_FLAGS: FlagSpec = FlagSpec {
    values: &[],
    switches: &[],
    stop_at_positional: false,
};

#[derive(Debug, Default)]
struct Scanned<'a> {
    values: Vec<(&'static str, &'a str)>,
    switches: Vec<&'static str>,
    positionals: Vec<&'a str>,
}

impl<'a> Scanned<'a> {
    fn first_value(&self, flag: &str) -> Option<&'a str> {
        self.values
            .iter()
            .find(|(name, _)| *name == flag)
            .map(|(_, value)| *value)
    }

    fn all_values(&self, flag: &'static str) -> impl Iterator<Item = &'a str> + '_ {
        self.values
            .iter()
            .filter(move |(name, _)| *name == flag)
            .map(|(_, value)| *value)
    }

    fn has(&self, switch: &str) -> bool {
        self.switches.contains(&switch)
    }

    fn positional(&self, index: usize, what: &'static str) -> Result<&'a str, CommandError> {
        self.positionals
            .get(index)
            .copied()
            .ok_or(CommandError::MissingArgument(what))
    }
}

/// Linear scan over the tokens. `--flag=value` and `--flag value` are both accepted.
fn scan<'a>(tokens: &[&'a str], spec: &FlagSpec) -> Result<Scanned<'a>, CommandError> {
    let mut scanned = Scanned::default();
    let mut iter = tokens.iter().copied();
    while let Some(token) = iter.next() {
        if !scanned.positionals.is_empty() && spec.stop_at_positional {
            scanned.positionals.push(token);
            continue;
        }
        if !token.starts_with('-') || token == "-" {
            scanned.positionals.push(token);
            continue;
        }

        let (flag, inline_value) = match token.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
            _ => (token, None),
        };

        if let Some((_, canonical)) = spec.values.iter().find(|(alias, _)| *alias == flag) {
            let value = match inline_value {
                Some("") => return Err(CommandError::MissingFlagValue(flag.to_string())),
                Some(value) => value,
                None => iter
                    .next()
                    .ok_or_else(|| CommandError::MissingFlagValue(flag.to_string()))?,
            };
            scanned.values.push((*canonical, value));
        } else if let Some((_, canonical)) = spec.switches.iter().find(|(alias, _)| *alias == flag)
        {
            scanned.switches.push(*canonical);
        } else {
            return Err(CommandError::UnknownFlag(flag.to_string()));
        }
    }
    Ok(scanned)
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((program, rest)) = tokens.split_first() else {
        return Err(CommandError::MissingArgument("command"));
    };
    if *program != PROGRAM {
        return Err(CommandError::UnknownCommand((*program).to_string()));
    }
    let Some((verb, args)) = rest.split_first() else {
        return Err(CommandError::MissingArgument("docker command"));
    };

    match *verb {
        "run" => parse_run(args),
        "ps" => parse_ps(args),
        "images" => parse_images(args),
        "pull" => parse_pull(args),
        "start" => container_target(args).map(Command::Start),
        "stop" => container_target(args).map(Command::Stop),
        "restart" => container_target(args).map(Command::Restart),
        "rm" => parse_rm(args),
        "rmi" => parse_rmi(args),
        "inspect" => parse_container_inspect(args),
        "container" => parse_container(args),
        "image" => parse_image(args),
        "volume" => parse_volume(args).map(Command::Volume),
        "network" => parse_network(args).map(Command::Network),
        other => Err(CommandError::UnknownSubcommand {
            group: PROGRAM,
            name: other.to_string(),
        }),
    }
}

/// `docker container ...`: the management form of the container verbs.
fn parse_container(args: &[&str]) -> Result<Command, CommandError> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(CommandError::MissingArgument("container command"));
    };
    match *sub {
        "run" => parse_run(rest),
        "ls" | "list" | "ps" => parse_ps(rest),
        "start" => container_target(rest).map(Command::Start),
        "stop" => container_target(rest).map(Command::Stop),
        "restart" => container_target(rest).map(Command::Restart),
        "rm" | "remove" => parse_rm(rest),
        "inspect" => parse_container_inspect(rest),
        "prune" => {
            scan(rest, &FORCE_FLAGS)?;
            Ok(Command::Container(ContainerCommand::Prune))
        }
        other => Err(CommandError::UnknownSubcommand {
            group: "container",
            name: other.to_string(),
        }),
    }
}

/// `docker image ...`: the management form of the image verbs.
fn parse_image(args: &[&str]) -> Result<Command, CommandError> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(CommandError::MissingArgument("image command"));
    };
    match *sub {
        "ls" | "list" => parse_images(rest),
        "pull" => parse_pull(rest),
        "rm" | "remove" => parse_rmi(rest),
        "inspect" => {
            let scanned = scan(rest, &NO_FLAGS)?;
            Ok(Command::Image(ImageCommand::Inspect {
                reference: scanned.positional(0, "IMAGE")?.to_string(),
            }))
        }
        "prune" => {
            let scanned = scan(rest, &IMAGE_PRUNE_FLAGS)?;
            Ok(Command::Image(ImageCommand::Prune {
                all: scanned.has("all"),
            }))
        }
        other => Err(CommandError::UnknownSubcommand {
            group: "image",
            name: other.to_string(),
        }),
    }
}

fn parse_ps(args: &[&str]) -> Result<Command, CommandError> {
    let scanned = scan(args, &PS_FLAGS)?;
    let both = scanned.has("all-quiet");
    Ok(Command::Ps(PsArgs {
        all: both || scanned.has("all"),
        quiet: both || scanned.has("quiet"),
    }))
}

fn parse_images(args: &[&str]) -> Result<Command, CommandError> {
    let scanned = scan(args, &QUIET_FLAGS)?;
    Ok(Command::Images(ImagesArgs {
        quiet: scanned.has("quiet"),
    }))
}

fn parse_pull(args: &[&str]) -> Result<Command, CommandError> {
    let scanned = scan(args, &NO_FLAGS)?;
    Ok(Command::Pull(PullArgs {
        image: ImageRef::parse(scanned.positional(0, "IMAGE")?),
    }))
}

fn parse_rm(args: &[&str]) -> Result<Command, CommandError> {
    let scanned = scan(args, &FORCE_FLAGS)?;
    Ok(Command::Rm(RmArgs {
        reference: scanned.positional(0, "CONTAINER")?.to_string(),
        force: scanned.has("force"),
    }))
}

fn parse_rmi(args: &[&str]) -> Result<Command, CommandError> {
    let scanned = scan(args, &FORCE_FLAGS)?;
    Ok(Command::Rmi(RmiArgs {
        reference: scanned.positional(0, "IMAGE")?.to_string(),
        force: scanned.has("force"),
    }))
}

fn parse_container_inspect(args: &[&str]) -> Result<Command, CommandError> {
    let scanned = scan(args, &NO_FLAGS)?;
    Ok(Command::Container(ContainerCommand::Inspect {
        reference: scanned.positional(0, "CONTAINER")?.to_string(),
    }))
}

fn parse_run(args: &[&str]) -> Result<Command, CommandError> {
    let scanned = scan(args, &RUN_FLAGS)?;
    let image = ImageRef::parse(scanned.positional(0, "IMAGE")?);
    Ok(Command::Run(RunArgs {
        image,
        ports: scanned.first_value("publish").map(str::to_string),
        name: scanned.first_value("name").map(str::to_string),
        network: scanned.first_value("network").map(str::to_string),
        mounts: scanned.all_values("volume").map(Mount::parse).collect(),
        command: scanned.positionals[1..]
            .iter()
            .map(|token| token.to_string())
            .collect(),
    }))
}

fn container_target(args: &[&str]) -> Result<ContainerTarget, CommandError> {
    let scanned = scan(args, &NO_FLAGS)?;
    Ok(ContainerTarget {
        reference: scanned.positional(0, "CONTAINER")?.to_string(),
    })
}

fn parse_volume(args: &[&str]) -> Result<VolumeCommand, CommandError> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(CommandError::MissingArgument("volume command"));
    };
    match *sub {
        "create" => {
            let scanned = scan(rest, &NO_FLAGS)?;
            Ok(VolumeCommand::Create {
                name: scanned.positional(0, "VOLUME")?.to_string(),
            })
        }
        "ls" | "list" => {
            let scanned = scan(rest, &QUIET_FLAGS)?;
            Ok(VolumeCommand::Ls {
                quiet: scanned.has("quiet"),
            })
        }
        "rm" | "remove" => {
            let scanned = scan(rest, &FORCE_FLAGS)?;
            Ok(VolumeCommand::Rm {
                name: scanned.positional(0, "VOLUME")?.to_string(),
                force: scanned.has("force"),
            })
        }
        "inspect" => {
            let scanned = scan(rest, &NO_FLAGS)?;
            Ok(VolumeCommand::Inspect {
                name: scanned.positional(0, "VOLUME")?.to_string(),
            })
        }
        "prune" => {
            scan(rest, &FORCE_FLAGS)?;
            Ok(VolumeCommand::Prune)
        }
        other => Err(CommandError::UnknownSubcommand {
            group: "volume",
            name: other.to_string(),
        }),
    }
}

fn parse_network(args: &[&str]) -> Result<NetworkCommand, CommandError> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(CommandError::MissingArgument("network command"));
    };
    match *sub {
        "create" => {
            let scanned = scan(rest, &NETWORK_CREATE_FLAGS)?;
            Ok(NetworkCommand::Create {
                name: scanned.positional(0, "NETWORK")?.to_string(),
                driver: scanned
                    .first_value("driver")
                    .unwrap_or(DEFAULT_NETWORK_DRIVER)
                    .to_string(),
            })
        }
        "ls" | "list" => {
            let scanned = scan(rest, &QUIET_FLAGS)?;
            Ok(NetworkCommand::Ls {
                quiet: scanned.has("quiet"),
            })
        }
        "rm" | "remove" => {
            let scanned = scan(rest, &NO_FLAGS)?;
            Ok(NetworkCommand::Rm {
                name: scanned.positional(0, "NETWORK")?.to_string(),
            })
        }
        "inspect" => {
            let scanned = scan(rest, &NO_FLAGS)?;
            Ok(NetworkCommand::Inspect {
                name: scanned.positional(0, "NETWORK")?.to_string(),
            })
        }
        "connect" => {
            let scanned = scan(rest, &NO_FLAGS)?;
            Ok(NetworkCommand::Connect {
                network: scanned.positional(0, "NETWORK")?.to_string(),
                container: scanned.positional(1, "CONTAINER")?.to_string(),
            })
        }
        "disconnect" => {
            let scanned = scan(rest, &FORCE_FLAGS)?;
            Ok(NetworkCommand::Disconnect {
                network: scanned.positional(0, "NETWORK")?.to_string(),
                container: scanned.positional(1, "CONTAINER")?.to_string(),
                force: scanned.has("force"),
            })
        }
        "prune" => {
            scan(rest, &FORCE_FLAGS)?;
            Ok(NetworkCommand::Prune)
        }
        other => Err(CommandError::UnknownSubcommand {
            group: "network",
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "tests/command_tests.rs"]
mod tests;
