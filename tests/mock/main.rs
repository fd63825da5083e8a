mod expectations;
