//! Interactive terminal front end over a [`Controller`].

use crate::console::command::Command;
use crate::console::help::HELP;
use crate::console::print::ExternalPrinter;
use crate::console::view::render_outcome;
use crate::controller::{Controller, Outcome};
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor, Editor};
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, SyncSender};
use std::thread;

pub mod command;
mod help;
pub mod print;
pub mod view;

const WELCOME_TEXT: &str = r#"
stepback: type `help` for the list of commands
"#;
const PROMT: &str = "(sb) ";

enum Control {
    Cmd(String),
    Terminate,
}

pub struct TerminalApplication {
    controller: Controller,
    json: bool,
}

impl TerminalApplication {
    /// With `json` set every outcome is printed as a single JSON line.
    pub fn new(controller: Controller, json: bool) -> Self {
        Self { controller, json }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let config = Config::builder().history_ignore_space(true).build();
        let mut editor: DefaultEditor = Editor::with_config(config)?;
        let printer = ExternalPrinter::new(&mut editor);

        let (control_tx, control_rx) = mpsc::sync_channel::<Control>(0);
        thread::spawn(move || read_loop(editor, control_tx));

        AppLoop {
            controller: self.controller,
            control_rx,
            printer,
            json: self.json,
        }
        .run();
        Ok(())
    }
}

fn read_loop(mut editor: DefaultEditor, control_tx: SyncSender<Control>) {
    println!("{WELCOME_TEXT}");
    loop {
        match editor.readline(PROMT) {
            Ok(input) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                _ = editor.add_history_entry(input);
                if control_tx.send(Control::Cmd(input.to_string())).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                _ = control_tx.send(Control::Terminate);
                break;
            }
            Err(err) => {
                println!("error: {:#}", err);
                _ = control_tx.send(Control::Terminate);
                break;
            }
        }
    }
}

struct AppLoop {
    controller: Controller,
    control_rx: Receiver<Control>,
    printer: ExternalPrinter,
    json: bool,
}

impl AppLoop {
    /// Execute a single command. Return false when the user asked to quit.
    fn handle_command(&mut self, input: &str) -> bool {
        let cmd = match Command::parse(input) {
            Ok(cmd) => cmd,
            Err(e) => {
                self.printer.print(format!("{} {e}", "error:".red().bold()));
                return true;
            }
        };

        let outcome = match cmd {
            Command::Start(file) => self.controller.start(file.as_deref()),
            Command::Target { start, end, file } => {
                self.controller.start_targeted(file.as_deref(), start, end)
            }
            Command::Break { file, lines } => self.controller.set_breakpoints(&file, &lines),
            Command::StepOver => self.controller.step_over(),
            Command::StepInto => self.controller.step_into(),
            Command::StepOut => self.controller.step_out(),
            Command::Continue => self.controller.continue_execution(),
            Command::Until(line) => self.controller.continue_to_line(line),
            Command::Back => self.controller.step_back(),
            Command::State => self.controller.get_state(),
            Command::Eval(expr) => self.controller.evaluate(&expr),
            Command::Stop => self.controller.stop(),
            Command::Help => {
                self.printer.print(HELP);
                return true;
            }
            Command::Quit => {
                self.controller.stop();
                return false;
            }
        };

        self.print_program_output();
        self.print_outcome(&outcome);
        true
    }

    fn print_program_output(&self) {
        for chunk in self.controller.take_output() {
            self.printer.print(chunk.trim_end_matches('\n'));
        }
    }

    fn print_outcome(&self, outcome: &Outcome) {
        if self.json {
            match serde_json::to_string(outcome) {
                Ok(line) => self.printer.print(line),
                Err(e) => self.printer.print(format!("error: {e:#}")),
            }
            return;
        }
        let text = render_outcome(outcome);
        if !text.is_empty() {
            self.printer.print(text);
        }
    }

    fn run(mut self) {
        loop {
            let Ok(action) = self.control_rx.recv() else {
                break;
            };

            match action {
                Control::Cmd(command) => {
                    if !self.handle_command(&command) {
                        break;
                    }
                }
                Control::Terminate => {
                    self.controller.stop();
                    break;
                }
            }
        }
    }
}
