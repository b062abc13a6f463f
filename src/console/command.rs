use itertools::Itertools;
use std::path::PathBuf;

pub const START_COMMAND: &str = "start";
pub const TARGET_COMMAND: &str = "target";
pub const BREAK_COMMAND: &str = "break";
pub const STEP_OVER_COMMAND: &str = "next";
pub const STEP_OVER_COMMAND_SHORT: &str = "n";
pub const STEP_INTO_COMMAND: &str = "step";
pub const STEP_INTO_COMMAND_SHORT: &str = "s";
pub const STEP_OUT_COMMAND: &str = "finish";
pub const STEP_OUT_COMMAND_SHORT: &str = "out";
pub const CONTINUE_COMMAND: &str = "continue";
pub const CONTINUE_COMMAND_SHORT: &str = "c";
pub const UNTIL_COMMAND: &str = "until";
pub const BACK_COMMAND: &str = "back";
pub const BACK_COMMAND_SHORT: &str = "b";
pub const STATE_COMMAND: &str = "state";
pub const EVAL_COMMAND: &str = "eval";
pub const EVAL_COMMAND_SHORT: &str = "p";
pub const STOP_COMMAND: &str = "stop";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";
pub const QUIT_COMMAND: &str = "quit";
pub const QUIT_COMMAND_SHORT: &str = "q";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    #[error("`{0}` expects {1}")]
    Usage(&'static str, &'static str),
    #[error("`{0}` is not a line number")]
    Line(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(Option<PathBuf>),
    Target {
        start: u32,
        end: u32,
        file: Option<PathBuf>,
    },
    Break {
        file: PathBuf,
        lines: Vec<u32>,
    },
    StepOver,
    StepInto,
    StepOut,
    Continue,
    Until(u32),
    Back,
    State,
    Eval(String),
    Stop,
    Help,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let mut words = input.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let args: Vec<&str> = words.collect();

        let no_args = |cmd: Command, name: &'static str| {
            if args.is_empty() {
                Ok(cmd)
            } else {
                Err(CommandError::Usage(name, "no arguments"))
            }
        };

        match head {
            START_COMMAND => match args.as_slice() {
                [] => Ok(Command::Start(None)),
                [file] => Ok(Command::Start(Some(PathBuf::from(file)))),
                _ => Err(CommandError::Usage(START_COMMAND, "an optional program path")),
            },
            TARGET_COMMAND => match args.as_slice() {
                [start, end] => Ok(Command::Target {
                    start: line(start)?,
                    end: line(end)?,
                    file: None,
                }),
                [start, end, file] => Ok(Command::Target {
                    start: line(start)?,
                    end: line(end)?,
                    file: Some(PathBuf::from(file)),
                }),
                _ => Err(CommandError::Usage(TARGET_COMMAND, "<start> <end> [file]")),
            },
            BREAK_COMMAND => match args.split_first() {
                Some((file, lines)) => Ok(Command::Break {
                    file: PathBuf::from(file),
                    lines: lines.iter().map(|l| line(l)).try_collect()?,
                }),
                None => Err(CommandError::Usage(BREAK_COMMAND, "<file> <line>...")),
            },
            STEP_OVER_COMMAND | STEP_OVER_COMMAND_SHORT => {
                no_args(Command::StepOver, STEP_OVER_COMMAND)
            }
            STEP_INTO_COMMAND | STEP_INTO_COMMAND_SHORT => {
                no_args(Command::StepInto, STEP_INTO_COMMAND)
            }
            STEP_OUT_COMMAND | STEP_OUT_COMMAND_SHORT => {
                no_args(Command::StepOut, STEP_OUT_COMMAND)
            }
            CONTINUE_COMMAND | CONTINUE_COMMAND_SHORT => {
                no_args(Command::Continue, CONTINUE_COMMAND)
            }
            UNTIL_COMMAND => match args.as_slice() {
                [l] => Ok(Command::Until(line(l)?)),
                _ => Err(CommandError::Usage(UNTIL_COMMAND, "<line>")),
            },
            BACK_COMMAND | BACK_COMMAND_SHORT => no_args(Command::Back, BACK_COMMAND),
            STATE_COMMAND => no_args(Command::State, STATE_COMMAND),
            EVAL_COMMAND | EVAL_COMMAND_SHORT => {
                if args.is_empty() {
                    Err(CommandError::Usage(EVAL_COMMAND, "an expression"))
                } else {
                    Ok(Command::Eval(args.iter().join(" ")))
                }
            }
            STOP_COMMAND => no_args(Command::Stop, STOP_COMMAND),
            HELP_COMMAND | HELP_COMMAND_SHORT => Ok(Command::Help),
            QUIT_COMMAND | QUIT_COMMAND_SHORT => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn line(word: &str) -> Result<u32, CommandError> {
    word.parse().map_err(|_| CommandError::Line(word.to_string()))
}
