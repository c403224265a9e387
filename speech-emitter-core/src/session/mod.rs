pub mod capture_loop;
pub mod emitter;
pub mod negotiator;

#[cfg(test)]
pub(crate) mod fake;
