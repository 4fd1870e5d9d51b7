pub mod turtle_writer;

pub use turtle_writer::TurtleWriter;
