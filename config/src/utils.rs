// mod tests