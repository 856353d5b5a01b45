mod frontend;
mod printer;
