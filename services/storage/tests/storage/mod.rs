mod blob;
mod queue;
mod signing;
mod table;
