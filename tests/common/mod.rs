//! Test helpers
//!
//! Grading sessions that replay into memory, plus the submissions the
//! scenarios grade.

#![allow(dead_code)]

use autograde::{CompiledUnit, GraderConfig, GradingSession, MemoryFileSystem, MemorySink, SourceUnit};
use std::sync::Arc;

pub fn session_with(config: GraderConfig) -> (GradingSession, MemorySink) {
    let sink = MemorySink::new();
    let session = GradingSession::with_fs(config, Arc::new(MemoryFileSystem::new()))
        .with_sink(Arc::new(sink.clone()));
    (session, sink)
}

/// Session that replays every capture
pub fn session() -> (GradingSession, MemorySink) {
    let mut config = GraderConfig::default();
    config.capture.replay = true;
    session_with(config)
}

pub fn compile(session: &GradingSession, source: &str) -> CompiledUnit {
    session
        .compile_source(SourceUnit::from_memory(source))
        .unwrap_or_else(|e| panic!("submission should compile: {e}"))
}

/// A reasonable submission for the bank account assignment
pub const BANK_ACCOUNT: &str = r#"
package bank;

import java.util.ArrayList;
import java.util.List;

public class BankAccount {
    private final String owner;
    private long balance;
    private List<String> history = new ArrayList<>();

    public BankAccount(String owner, long opening) {
        this.owner = owner;
        this.balance = opening;
        history.add("open " + opening);
    }

    public void deposit(long amount) {
        if (amount <= 0) {
            throw new IllegalArgumentException("amount must be positive");
        }
        balance += amount;
        history.add("deposit " + amount);
    }

    public boolean withdraw(long amount) {
        if (amount > balance) {
            return false;
        }
        balance -= amount;
        history.add("withdraw " + amount);
        return true;
    }

    public long getBalance() { return balance; }

    public String getOwner() { return owner; }

    public int transactions() { return history.size(); }

    @Override
    public String toString() {
        return String.format("%s: %d", owner, balance);
    }
}
"#;

/// An interactive program reading from standard input
pub const SUMMER: &str = r#"
import java.util.Scanner;

public class Summer {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        int count = Integer.parseInt(in.nextLine().trim());
        int total = 0;
        for (int i = 0; i < count; i++) {
            int n = in.nextInt();
            total += n;
            System.out.println("running total: " + total);
        }
        System.out.printf("sum=%d%n", total);
    }
}
"#;

/// A submission with every classic failure
pub const BROKEN: &str = r#"
public class Broken {
    public static int spin() {
        int i = 0;
        while (i >= 0) { i = (i + 1) % 10; }
        return i;
    }

    public static void bail() {
        System.out.println("giving up");
        System.exit(42);
    }

    public static int crash(int[] values) {
        return values[values.length];
    }

    public static String deep(int n) {
        return deep(n + 1);
    }

    public static int fine() { return 7; }
}
"#;
