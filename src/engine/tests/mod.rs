mod helpers;
mod tests_basic;
