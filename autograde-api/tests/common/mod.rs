//! Test helpers
//!
//! Sessions over an in-memory file system that replay into a [`MemorySink`].

#![allow(dead_code)]

use autograde_api::{
    CompiledUnit, GraderConfig, GradingSession, MemoryFileSystem, MemorySink, SourceUnit,
};
use std::sync::Arc;

pub struct Harness {
    pub session: GradingSession,
    pub sink: MemorySink,
    pub fs: MemoryFileSystem,
}

impl Harness {
    pub fn new() -> Self {
        let mut config = GraderConfig::default();
        config.capture.replay = true;
        Self::with_config(config)
    }

    pub fn with_config(config: GraderConfig) -> Self {
        let sink = MemorySink::new();
        let fs = MemoryFileSystem::new();
        let session = GradingSession::with_fs(config, Arc::new(fs.clone())).with_sink(Arc::new(sink.clone()));
        Self { session, sink, fs }
    }

    pub fn compile(&self, source: &str) -> CompiledUnit {
        self.session
            .compile_source(SourceUnit::from_memory(source))
            .unwrap_or_else(|e| panic!("unit should compile: {e}"))
    }
}

pub const CALCULATOR: &str = r#"
public class Calculator {
    private int memory;

    public Calculator() {}

    public Calculator(int memory) { this.memory = memory; }

    public int add(int a, int b) { return a + b; }

    public static int max(int a, int b) { return a > b ? a : b; }

    public double average(int[] values) {
        int sum = 0;
        for (int v : values) { sum += v; }
        return (double) sum / values.length;
    }

    public void forever() {
        long n = 0;
        while (true) { n++; }
    }

    public int recall() { return memory; }
}
"#;

pub const READER: &str = r#"
import java.util.Scanner;

public class Reader {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        for (int i = 0; i < 3; i++) {
            String line = in.nextLine();
            System.out.println("got " + line);
        }
    }
}
"#;

pub const QUITTER: &str = r#"
public class Quitter {
    public static int run() {
        System.out.println("before");
        System.exit(1);
        System.out.println("after");
        return 0;
    }
}
"#;
