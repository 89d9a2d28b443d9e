pub mod sexp;
pub mod smtlib_backend;
pub mod smtlib_printer;
pub mod z3_backend;
