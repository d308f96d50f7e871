//! Reproduces the reference `gctest.c` scenario: build an array of `N`
//! pointers to freshly allocated ints, root the array, and collect.
//!
//! ```text
//! USAGE: gctest <number of objects>
//! ```
//!
//! Run with `RUST_LOG=debug` to see the collector's own allocation and
//! collection-boundary logging.

use std::process::ExitCode;

use precisegc::{collect, new, root_insert, Layout};

fn main() -> ExitCode {
  env_logger::init();

  let mut args = std::env::args();
  let program = args.next().unwrap_or_else(|| "gctest".to_string());

  let num_objs: usize = match args.next().and_then(|s| s.parse().ok()) {
    Some(n) => n,
    None => {
      eprintln!("USAGE: {program} <number of objects>");
      return ExitCode::FAILURE;
    }
  };

  // Define what an int object looks like to the collector: four bytes,
  // no outgoing pointers.
  let int_layout = Layout::atomic(std::mem::size_of::<i32>());

  // Define an array of pointers to int objects.
  let array_layout = Layout::ptr_array(num_objs);

  let array = new(&array_layout) as *mut *mut u8;
  assert!(!array.is_null(), "array allocation failed");

  for i in 0..num_objs {
    let p = new(&int_layout);
    assert!(!p.is_null(), "int allocation failed");
    unsafe {
      (p as *mut i32).write(i as i32);
      array.add(i).write(p);
    }
  }

  root_insert(array as *mut u8);
  collect();

  println!("gctest: allocated and collected an array of {num_objs} ints");
  ExitCode::SUCCESS
}
