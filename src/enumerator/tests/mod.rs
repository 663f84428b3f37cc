mod tests_enumerator;
