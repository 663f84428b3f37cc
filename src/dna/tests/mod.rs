mod tests_alphabet;
