//! System Snapshot for the `sysinfo` built-in
//!
//! CPU, memory and root-disk usage plus the busiest processes, rendered as
//! a fixed-width text table.

use std::fmt::Write;
use std::path::Path;
use sysinfo::{Disks, System};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const TOP_PROCESSES: usize = 5;

/// One row of the process table
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

/// Point-in-time resource usage
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub cpu_percent: f32,
    pub cpu_count: usize,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    /// Highest CPU usage first
    pub processes: Vec<ProcessSample>,
}

impl SystemSnapshot {
    /// Sample the host
    ///
    /// Blocks for the minimum CPU sampling interval, so call it from a
    /// blocking thread.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_all();

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| disks.list().first());
        let (disk_total, disk_used) = root
            .map(|d| (d.total_space(), d.total_space().saturating_sub(d.available_space())))
            .unwrap_or((0, 0));

        let memory_total = sys.total_memory();
        let mut processes: Vec<ProcessSample> = sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessSample {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cpu_percent: process.cpu_usage(),
                memory_percent: percent(process.memory(), memory_total),
            })
            .collect();
        processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        processes.truncate(TOP_PROCESSES);

        Self {
            cpu_percent: sys.global_cpu_usage(),
            cpu_count: sys.cpus().len(),
            memory_used: sys.used_memory(),
            memory_total,
            disk_used,
            disk_total,
            processes,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "\nSystem Information:\n==================\n\n\
             CPU Usage: {:.1}% ({} cores)\n\
             Memory Usage: {:.1}GB / {:.1}GB ({:.1}%)\n\
             Disk Usage: {:.1}GB / {:.1}GB ({:.1}%)\n\n\
             Top Processes (by CPU):\n----------------------\n\
             {:<8} {:<20} {:<8} {:<8}\n{}",
            self.cpu_percent,
            self.cpu_count,
            self.memory_used as f64 / GIB,
            self.memory_total as f64 / GIB,
            percent(self.memory_used, self.memory_total),
            self.disk_used as f64 / GIB,
            self.disk_total as f64 / GIB,
            percent(self.disk_used, self.disk_total),
            "PID",
            "Name",
            "CPU%",
            "Memory%",
            "-".repeat(50),
        );

        for process in &self.processes {
            let name: String = if process.name.is_empty() {
                "Unknown".to_string()
            } else {
                process.name.chars().take(19).collect()
            };
            let _ = write!(
                out,
                "\n{:<8} {:<20} {:<8.1} {:<8.1}",
                process.pid, name, process.cpu_percent, process.memory_percent
            );
        }
        out
    }
}

fn percent(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0) as f32
    }
}
