use rustyline::history::History;
use rustyline::{Editor, ExternalPrinter as RLExternalPrinter, Helper};
use std::cell::RefCell;

/// Prints messages without breaking the prompt line the editor is currently showing.
///
/// Falls back to plain stdout when the editor cannot provide an external printer
/// (stdin is not a terminal, for example).
pub struct ExternalPrinter {
    printer: Option<RefCell<Box<dyn RLExternalPrinter>>>,
}

unsafe impl Send for ExternalPrinter {}

impl ExternalPrinter {
    pub fn new<H: Helper, I: History>(editor: &mut Editor<H, I>) -> Self {
        let printer = editor
            .create_external_printer()
            .ok()
            .map(|p| RefCell::new(Box::new(p) as Box<dyn RLExternalPrinter>));
        Self { printer }
    }

    pub fn print(&self, msg: impl Into<String>) {
        let msg = msg.into();
        match &self.printer {
            None => {
                println!("{msg}")
            }
            Some(printer) => {
                if let Err(e) = printer.borrow_mut().print(msg.clone()) {
                    log::debug!(target: "controller", "external printer: {e}");
                    println!("{msg}");
                }
            }
        }
    }
}
