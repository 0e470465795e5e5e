//! Minimal end-to-end demo: a printing surface fed by hand-emitted
//! dataset snapshots.
//!
//! Run with `cargo run --example basic`.

use std::sync::Arc;

use simplelog::{Config, LevelFilter, SimpleLogger};
use trellis::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Task {
    id: u32,
    title: &'static str,
    done: bool,
}

/// A render surface that prints every structural operation and keeps the
/// rendered rows in a plain vector.
struct PrintSurface {
    name: &'static str,
    next_handle: usize,
    rows: Vec<usize>,
}

impl PrintSurface {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            next_handle: 0,
            rows: Vec::new(),
        }
    }
}

impl RenderSurface<Task> for PrintSurface {
    type Handle = usize;

    fn insert_at(
        &mut self,
        template: &Arc<RowDef<Task>>,
        index: usize,
        context: &RowContext<Task>,
    ) -> usize {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.rows.insert(index, handle);
        println!(
            "[{}] insert @{index} columns={:?} record={:?}",
            self.name,
            template.columns(),
            context.record
        );
        handle
    }

    fn move_to(&mut self, handle: &usize, from: usize, to: usize) {
        let row = self.rows.remove(from);
        debug_assert_eq!(row, *handle);
        self.rows.insert(to, row);
        println!("[{}] move {from} -> {to}", self.name);
    }

    fn remove_at(&mut self, index: usize) {
        self.rows.remove(index);
        println!("[{}] remove @{index}", self.name);
    }

    fn set_local_context(&mut self, _handle: &usize, context: &RowContext<Task>) {
        if let Some(record) = &context.record {
            println!(
                "[{}] context: {:?} index={:?} first={} last={}",
                self.name, record.title, context.index, context.first, context.last
            );
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

fn main() -> Result<(), TableError> {
    SimpleLogger::init(LevelFilter::Debug, Config::default()).expect("Failed to initialize logger");

    let mut table = TableController::new(
        PrintSurface::new("header"),
        PrintSurface::new("data"),
        PrintSurface::new("footer"),
    );

    table.add_column(ColumnDef::new("title"))?;
    table.add_column(ColumnDef::new("status"))?;
    table.add_header_def(RowDef::header(["title", "status"]));
    table.add_footer_def(RowDef::footer(["status"]));
    // Done tasks render without the status column; everything else uses
    // the default definition.
    table.add_data_def(RowDef::data_when(["title"], |_, task: &Task| task.done));
    table.add_data_def(RowDef::data(["title", "status"]));
    table.set_track_by(Some(Arc::new(|_, task: &Task| task.id.to_string())));

    let source = SnapshotSource::new();
    let handle = source.handle();
    table.attach_source(Box::new(source));
    table.check()?;

    println!("--- first snapshot ---");
    handle.emit(vec![
        Task { id: 1, title: "write docs", done: false },
        Task { id: 2, title: "review", done: false },
        Task { id: 3, title: "ship", done: false },
    ]);
    table.poll()?;

    println!("--- reorder, one task done ---");
    handle.emit(vec![
        Task { id: 3, title: "ship", done: false },
        Task { id: 1, title: "write docs", done: true },
        Task { id: 2, title: "review", done: false },
    ]);
    table.poll()?;

    println!("--- empty ---");
    handle.emit(Vec::new());
    table.poll()?;

    table.destroy();
    Ok(())
}
