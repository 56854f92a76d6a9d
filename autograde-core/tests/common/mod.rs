//! Test helpers
//!
//! Compile a unit with the embedded toolchain and run it against an
//! in-memory console.

#![allow(dead_code)]

use autograde_core::{
    CancelToken, ClassImage, ClassResolver, Console, Diagnostic, EmbeddedToolchain, ExecEnv, ExitHook,
    Interpreter, Raised, RuntimeClass, RuntimeLimits, Toolchain, ToolchainSource, Value,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Console with scripted input and a single output buffer
#[derive(Default)]
pub struct TestConsole {
    output: Mutex<String>,
    input: Mutex<VecDeque<String>>,
}

impl TestConsole {
    pub fn with_input(lines: &[&str]) -> Self {
        Self {
            output: Mutex::new(String::new()),
            input: Mutex::new(lines.iter().map(|l| l.to_string()).collect()),
        }
    }

    pub fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }
}

impl Console for TestConsole {
    fn write_out(&self, text: &str) {
        self.output.lock().unwrap().push_str(text);
    }

    fn read_line(&self) -> Option<String> {
        self.input.lock().unwrap().pop_front()
    }

    fn has_line(&self) -> bool {
        !self.input.lock().unwrap().is_empty()
    }
}

/// Records exit requests instead of exiting
#[derive(Default)]
pub struct RecordingExit {
    pub requests: Mutex<Vec<i32>>,
}

impl ExitHook for RecordingExit {
    fn on_exit(&self, status: i32) {
        self.requests.lock().unwrap().push(status);
    }
}

/// Classes by qualified and simple name
#[derive(Default)]
pub struct Classes {
    by_name: HashMap<String, Arc<RuntimeClass>>,
}

impl Classes {
    pub fn define(&mut self, image: ClassImage) -> Arc<RuntimeClass> {
        let class = RuntimeClass::new(image);
        self.by_name
            .insert(class.simple_name().to_string(), Arc::clone(&class));
        self.by_name.insert(class.name().to_string(), Arc::clone(&class));
        class
    }
}

impl ClassResolver for Classes {
    fn find_class(&self, name: &str) -> Option<Arc<RuntimeClass>> {
        self.by_name.get(name).cloned()
    }
}

pub fn compile(source: &str) -> Result<Vec<ClassImage>, Vec<Diagnostic>> {
    EmbeddedToolchain
        .compile(&[ToolchainSource::new("Main.java", source)], &[])
        .map(|output| output.classes)
}

/// Messages of the compile errors of `source`
pub fn compile_errors(source: &str) -> Vec<String> {
    match compile(source) {
        Ok(_) => Vec::new(),
        Err(errors) => errors.into_iter().map(|d| d.message).collect(),
    }
}

/// What a run produced
pub struct Run {
    pub result: Result<Value, Raised>,
    pub output: String,
    pub exits: Vec<i32>,
}

impl Run {
    /// Class of the uncaught exception, if any
    pub fn exception(&self) -> Option<String> {
        match &self.result {
            Err(Raised::Exception(t)) => Some(t.class.clone()),
            _ => None,
        }
    }
}

fn load(source: &str) -> (Classes, Vec<Arc<RuntimeClass>>) {
    let images = compile(source).unwrap_or_else(|errors| {
        let rendered: Vec<String> = errors.iter().map(|d| d.to_string()).collect();
        panic!("compile failed:\n{}", rendered.join("\n"))
    });
    let mut classes = Classes::default();
    let defined = images.into_iter().map(|image| classes.define(image)).collect();
    (classes, defined)
}

/// Runs on a thread with a large stack so deep recursion reaches the
/// interpreter's own call-depth limit first
fn run_with<F>(source: &str, input: &[&str], f: F) -> Run
where
    F: FnOnce(&mut Interpreter<'_>, &[Arc<RuntimeClass>]) -> Result<Value, Raised> + Send,
{
    std::thread::scope(|scope| {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn_scoped(scope, move || {
                let (classes, defined) = load(source);
                let console = Arc::new(TestConsole::with_input(input));
                let exit = Arc::new(RecordingExit::default());
                let env = ExecEnv {
                    classes: Arc::new(classes),
                    console: Arc::clone(&console) as Arc<dyn Console>,
                    exit: Arc::clone(&exit) as Arc<dyn ExitHook>,
                    cancel: CancelToken::new(),
                    limits: RuntimeLimits::default(),
                };
                let mut interp = Interpreter::new(&env);
                let result = f(&mut interp, &defined);
                let exits = exit.requests.lock().unwrap().clone();
                Run {
                    result,
                    output: console.output(),
                    exits,
                }
            })
            .expect("spawn test thread")
            .join()
            .expect("test thread panicked")
    })
}

/// Run `main` of the first class in `source`
pub fn run_main(source: &str, input: &[&str]) -> Run {
    run_with(source, input, |interp, classes| interp.run_main(&classes[0], Vec::new()))
}

/// Call a static method of the first class
pub fn call_static(source: &str, method: &str, args: Vec<Value>) -> Run {
    run_with(source, &[], |interp, classes| {
        interp.call_by_name(&classes[0], None, method, args)
    })
}

/// Output of `main`, failing the test on any fault
pub fn output_of(source: &str) -> String {
    let run = run_main(source, &[]);
    if let Err(raised) = &run.result {
        panic!("unexpected fault {raised:?}; output so far:\n{}", run.output);
    }
    run.output
}

/// Wrap statements in `public class Main { public static void main(..) { .. } }`
pub fn main_body(statements: &str) -> String {
    format!("public class Main {{\n    public static void main(String[] args) {{\n{statements}\n    }}\n}}\n")
}
